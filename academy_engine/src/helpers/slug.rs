//! URL slugs for catalog items.
//!
//! A title is normalised into lower-case ASCII words joined by hyphens. Accented letters are decomposed (NFD) and
//! their combining marks dropped, so "Café Déjà Vu" becomes `cafe-deja-vu`. Collisions within a catalog kind are
//! resolved by appending `-2`, `-3`, and so on.
use log::*;
use rand::{distributions::Alphanumeric, Rng};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::{
    db_types::CatalogKind,
    traits::{IdentifierError, IdentifierLookup},
};

/// Number of numbered suffixes tried before falling back to a random suffix.
pub const MAX_SLUG_ATTEMPTS: usize = 50;
const RANDOM_SUFFIX_LEN: usize = 6;

/// Deterministic slug for `title`. May return an empty string if the title has no ASCII letters or digits.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.nfd().filter(|c| !is_combining_mark(*c)).flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Produces a slug for `title` that is not yet used by another item of the same `kind`.
///
/// `exclude_id` is the id of the item being renamed, if any, so that it does not collide with itself.
pub async fn generate_slug<L: IdentifierLookup>(
    lookup: &L,
    kind: CatalogKind,
    title: &str,
    exclude_id: Option<i64>,
) -> Result<String, IdentifierError> {
    let base = slugify(title);
    if base.is_empty() {
        return Err(IdentifierError::InvalidInput(format!("'{title}' does not contain any usable characters")));
    }
    if !lookup.slug_exists(kind, &base, exclude_id).await? {
        return Ok(base);
    }
    for n in 2..=MAX_SLUG_ATTEMPTS + 1 {
        let candidate = format!("{base}-{n}");
        if !lookup.slug_exists(kind, &candidate, exclude_id).await? {
            trace!("🏷️ Slug '{base}' is taken. Using '{candidate}'");
            return Ok(candidate);
        }
    }
    let candidate = format!("{base}-{}", random_suffix());
    warn!("🏷️ Gave up on numbered suffixes for '{base}' after {MAX_SLUG_ATTEMPTS} attempts. Using '{candidate}'");
    Ok(candidate)
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}
