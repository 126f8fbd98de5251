mod classroom;
mod http;
mod sheets;

pub use classroom::{ClassroomApi, ClassroomClient};
#[cfg(test)]
pub use classroom::StudentPage;
pub use sheets::{SheetsApi, SheetsClient, ValueInputMode};
