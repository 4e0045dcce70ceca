/// Slot date/time parsing and reminder window math
pub mod datetime;
/// Boundary validation for user-entered values
pub mod validation;
