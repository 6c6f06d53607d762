//! Initial ledger schema.
//!
//! Creates the account, pocket and transaction tables with the constraints
//! that back the ledger invariants at the storage level.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TABLES
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(POCKETS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 3: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE account_type AS ENUM (
    'saving',
    'fixed_deposit',
    'fcd',
    'mutual_fund',
    'stock'
);

CREATE TYPE pocket_type AS ENUM ('cashbox', 'normal');

CREATE TYPE transaction_type AS ENUM ('deposit', 'withdraw', 'transfer');
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    account_type account_type NOT NULL,
    name VARCHAR(255) NOT NULL,
    bank VARCHAR(255) NOT NULL,
    balance NUMERIC NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_accounts_balance_non_negative CHECK (balance >= 0)
);

CREATE INDEX idx_accounts_user ON accounts(user_id, created_at);
";

const POCKETS_SQL: &str = r"
CREATE TABLE pockets (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    pocket_type pocket_type NOT NULL,
    balance NUMERIC NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_pockets_balance_non_negative CHECK (balance >= 0)
);

CREATE INDEX idx_pockets_account ON pockets(account_id, created_at);

-- At most one cashbox per account
CREATE UNIQUE INDEX uq_pockets_one_cashbox
    ON pockets(account_id)
    WHERE pocket_type = 'cashbox';
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    transaction_type transaction_type NOT NULL,
    -- No foreign keys: history survives pocket deletion
    from_pocket_id UUID,
    to_pocket_id UUID,
    amount NUMERIC NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_transactions_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_transactions_kind_shape CHECK (
        (transaction_type = 'deposit' AND from_pocket_id IS NULL AND to_pocket_id IS NOT NULL)
        OR (transaction_type = 'withdraw' AND from_pocket_id IS NOT NULL AND to_pocket_id IS NULL)
        OR (transaction_type = 'transfer' AND from_pocket_id IS NOT NULL AND to_pocket_id IS NOT NULL
            AND from_pocket_id <> to_pocket_id)
    )
);

CREATE INDEX idx_transactions_account ON transactions(account_id, created_at DESC);
";

const TRIGGERS_SQL: &str = r"
CREATE OR REPLACE FUNCTION update_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = NOW();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_accounts_updated_at
    BEFORE UPDATE ON accounts
    FOR EACH ROW EXECUTE FUNCTION update_updated_at();

CREATE TRIGGER trg_pockets_updated_at
    BEFORE UPDATE ON pockets
    FOR EACH ROW EXECUTE FUNCTION update_updated_at();

-- Transactions are append-only
CREATE OR REPLACE FUNCTION reject_transaction_update()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'transactions are immutable';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_transactions_immutable
    BEFORE UPDATE ON transactions
    FOR EACH ROW EXECUTE FUNCTION reject_transaction_update();
";

const DROP_ALL_SQL: &str = r"
-- ============================================================
-- DROP ALL: Rollback migration
-- Order matters due to foreign key constraints
-- ============================================================

DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS pockets CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;

DROP FUNCTION IF EXISTS reject_transaction_update() CASCADE;
DROP FUNCTION IF EXISTS update_updated_at() CASCADE;

DROP TYPE IF EXISTS transaction_type;
DROP TYPE IF EXISTS pocket_type;
DROP TYPE IF EXISTS account_type;
";
