/// Joins a metagroup prefix onto a metadata key with `/`, collapsing doubled
/// separators. Metagroup names may carry their own trailing slash (`oct/`),
/// so a plain join can produce runs of separators.
pub fn join_meta_name(prefix: &str, key: &str) -> String {
    let mut joined = format!("{prefix}/{key}");
    while joined.contains("//") {
        joined = joined.replace("//", "/");
    }
    joined
}
