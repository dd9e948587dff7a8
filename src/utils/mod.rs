use chrono::{DateTime, Utc};

/// Default name of the journal file kept by a directory target
pub const DEFAULT_JOURNAL_FILE: &str = ".migrations.json";

/// Default name of the configuration file looked up in a target directory
pub const DEFAULT_CONFIG_FILE: &str = "migrator.json";

/// Schema version written into journal files
pub const JOURNAL_SCHEMA_VERSION: u32 = 1;

/// Current crate version
pub const ORCHESTRATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the current UTC time, the recommended clock for applied-at stamps
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Strip the module path from a fully qualified type name.
///
/// Generic arguments are kept: `a::b::Foo<c::Bar>` becomes `Foo<c::Bar>`.
pub fn short_type_name(full: &'static str) -> &'static str {
    let base_end = full.find('<').unwrap_or(full.len());
    match full[..base_end].rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("crate::migration::AddUsers"), "AddUsers");
        assert_eq!(short_type_name("AddUsers"), "AddUsers");
        assert_eq!(
            short_type_name("crate::m::Wrapper<crate::m::Inner>"),
            "Wrapper<crate::m::Inner>"
        );
    }
}
