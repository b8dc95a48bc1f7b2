use rand::Rng;

/// Supplies 4-digit folio candidates for quote codes. Random by default;
/// uniqueness is the caller's responsibility against the store, retrying
/// with a fresh folio on collision.
pub trait FolioSource: Send + Sync {
    fn next_folio(&self) -> u16;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RandomFolioSource;

impl FolioSource for RandomFolioSource {
    fn next_folio(&self) -> u16 {
        rand::thread_rng().gen_range(0..10_000)
    }
}

/// Builds a `P1P2-C1C2-FOLIO` code from partner and client names.
/// Pure; the same inputs always produce the same code.
pub fn generate_code(partner_name: &str, client_name: &str, folio: u16) -> String {
    format!("{}-{}-{:04}", initials(partner_name), initials(client_name), folio % 10_000)
}

/// First character of up to the first two whitespace-separated tokens,
/// uppercased. Single-word names yield a single-letter segment.
fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|token| token.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}
