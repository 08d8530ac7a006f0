//! Slug derivation for schema titles.

/// Derive a URL-safe slug from a title: lowercase, runs of non-alphanumeric
/// characters collapsed to a single `-`, leading and trailing separators
/// dropped. Deterministic; shared by every version of the same title.
pub fn slugify(title: &str) -> String {
  let mut slug = String::with_capacity(title.len());
  let mut pending_separator = false;

  for c in title.chars() {
    if c.is_alphanumeric() {
      if pending_separator && !slug.is_empty() {
        slug.push('-');
      }
      pending_separator = false;
      slug.extend(c.to_lowercase());
    } else {
      pending_separator = true;
    }
  }

  slug
}

#[cfg(test)]
mod tests {
  use super::slugify;

  #[test]
  fn lowercases_and_joins_words() {
    assert_eq!(slugify("Dataset Meta"), "dataset-meta");
    assert_eq!(slugify("dataset-meta"), "dataset-meta");
  }

  #[test]
  fn collapses_runs_of_separators() {
    assert_eq!(slugify("Social  Science -- Survey!"), "social-science-survey");
  }

  #[test]
  fn trims_edges() {
    assert_eq!(slugify("  GIS / Shapefile  "), "gis-shapefile");
    assert_eq!(slugify("!!!"), "");
  }

  #[test]
  fn stable_across_versions_of_same_title() {
    assert_eq!(slugify("Astronomy FITS"), slugify("Astronomy FITS"));
  }
}
