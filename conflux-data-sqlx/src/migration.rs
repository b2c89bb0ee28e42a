//! Schema for the two tables this crate owns. Applied via `sqlx::migrate!()`
//! from the binary crate; this module documents the shape only.
//!
//! ```sql
//! CREATE TABLE entity_state (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     organization_id UUID NOT NULL,
//!     sync_id UUID NOT NULL,
//!     entity_id TEXT NOT NULL,
//!     hash TEXT NOT NULL,
//!     sync_job_id UUID NOT NULL,
//!     modified_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     UNIQUE (sync_id, entity_id)
//! );
//!
//! CREATE TABLE access_control_membership (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     organization_id UUID NOT NULL,
//!     source_connection_id UUID NOT NULL,
//!     group_id TEXT NOT NULL,
//!     member_id TEXT NOT NULL,
//!     member_type TEXT NOT NULL,
//!     group_name TEXT,
//!     source_name TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     UNIQUE (organization_id, source_connection_id, group_id, member_id, member_type)
//! );
//! ```
