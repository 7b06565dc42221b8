pub mod profile;
pub mod user;
pub mod wallet;
pub mod expense;
pub mod income;
pub mod comment;

pub use profile::{Profile, ProfileUpdate, Role};
pub use user::{Credentials, Session, User, UserRecord};
pub use wallet::{Wallet, MAX_AMOUNT};
pub use expense::{Expense, NewExpense};
pub use income::{Income, NewIncome};
pub use comment::{Comment, NewComment};
