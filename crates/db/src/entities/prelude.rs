//! `SeaORM` entity prelude.

pub use super::accounts::Entity as Accounts;
pub use super::pockets::Entity as Pockets;
pub use super::transactions::Entity as Transactions;
