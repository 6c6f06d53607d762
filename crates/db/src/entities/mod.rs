//! `SeaORM` entities for the ledger tables.

pub mod prelude;

pub mod accounts;
pub mod pockets;
pub mod sea_orm_active_enums;
pub mod transactions;
