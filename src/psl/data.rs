/// Embedded snapshot in the `publicsuffix.org` list format (spec §6.2):
/// UTF-8, `//` comments, `*.` wildcards, `!` exceptions, and a
/// `===BEGIN PRIVATE DOMAINS===` divider separating registry rules from
/// privately-operated ones.
///
/// This is a small, illustrative excerpt curated to exercise every rule
/// kind the engine understands (plain, wildcard, exception, private,
/// IDNA) — not a byte-for-byte copy of the upstream Mozilla file, which is
/// refreshed far more often than this crate is released. Hosts that need
/// the authoritative, current list should load it with
/// [`crate::psl::PslEngine::from_str`] instead of [`crate::psl::PslEngine::builtin`].
pub const BUILTIN_PSL: &str = include_str!("public_suffix_list.dat");
