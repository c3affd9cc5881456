//! Embedded SQL migrations, compiled into the binary with `include_str!`.

/// One migration: a stable id and its SQL text.
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All embedded migrations, in application order.
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_initial_schema",
            sql: include_str!("../../migrations/001_initial_schema.sql"),
        },
        Migration {
            id: "002_ignore_rules_and_options",
            sql: include_str!("../../migrations/002_ignore_rules_and_options.sql"),
        },
    ]
}
