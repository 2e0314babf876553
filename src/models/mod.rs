pub mod expense;
pub mod violation;

pub use expense::{Category, CreateExpenseDto, Expense, ExpenseStatus, UpdateExpenseDto};
pub use violation::{Violation, ViolationSeverity, ViolationType};
