pub mod lesson_record;
pub mod payment;
pub mod registration;
pub mod slot;
pub mod student;
pub mod teacher;

pub use lesson_record::*;
pub use payment::*;
pub use registration::*;
pub use slot::*;
pub use student::*;
pub use teacher::*;
