//! Typed field access for relationship emission (§4.5, REDESIGN FLAGS).
//!
//! Defined on [`conflux_core::entity`] (alongside [`conflux_core::Entity`]
//! itself) so that `Entity::as_fields` can return it without a dependency
//! cycle between this crate and `conflux-core`; re-exported here under the
//! name the rest of the engine imports it by.

pub use conflux_core::entity::{FieldValue, Fields};

#[cfg(test)]
mod tests {
    use super::*;

    struct Ticket {
        assignee_id: String,
        watcher_ids: Vec<String>,
    }

    impl Fields for Ticket {
        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "assignee_id" => Some(FieldValue::One(self.assignee_id.clone())),
                "watcher_ids" => Some(FieldValue::Many(self.watcher_ids.clone())),
                _ => None,
            }
        }

        fn field_names(&self) -> &'static [&'static str] {
            &["assignee_id", "watcher_ids"]
        }
    }

    #[test]
    fn resolves_declared_scalar_and_list_fields() {
        let ticket = Ticket { assignee_id: "u1".into(), watcher_ids: vec!["u2".into(), "u3".into()] };
        assert_eq!(ticket.field("assignee_id").unwrap().into_ids(), vec!["u1"]);
        assert_eq!(ticket.field("watcher_ids").unwrap().into_ids(), vec!["u2", "u3"]);
    }

    #[test]
    fn unknown_field_is_none() {
        let ticket = Ticket { assignee_id: "u1".into(), watcher_ids: vec![] };
        assert!(ticket.field("nonexistent").is_none());
    }
}
