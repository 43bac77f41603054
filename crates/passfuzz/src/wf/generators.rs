//! Leaf text generators.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use indexmap::IndexMap;
use rand::prelude::*;
use rand::rngs::SmallRng;

use crate::ast::Token;

/// Produces the source text of a generated leaf.
pub type GenLocationFn = Arc<dyn Fn(&mut SmallRng) -> String + Send + Sync>;

/// Per-token leaf text generators.
///
/// Leaves whose token has no generator get the token's name as their text.
#[derive(Clone, Default)]
pub struct Generators {
    by_token: IndexMap<Token, GenLocationFn>,
}

impl Generators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<F>(mut self, token: Token, f: F) -> Self
    where
        F: Fn(&mut SmallRng) -> String + Send + Sync + 'static,
    {
        self.insert(token, f);
        self
    }

    pub fn insert<F>(&mut self, token: Token, f: F)
    where
        F: Fn(&mut SmallRng) -> String + Send + Sync + 'static,
    {
        self.by_token.insert(token, Arc::new(f));
    }

    pub fn contains(&self, token: Token) -> bool {
        self.by_token.contains_key(&token)
    }

    pub fn generate(&self, token: Token, rng: &mut SmallRng) -> String {
        match self.by_token.get(&token) {
            Some(f) => f(rng),
            None => token.name().to_string(),
        }
    }
}

impl fmt::Debug for Generators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.by_token.keys()).finish()
    }
}

/// Identifiers `{prefix}0` .. `{prefix}{pool - 1}`.
///
/// A small pool makes collisions between generated names likely, which is
/// what binding checks need to be exercised.
pub fn ident(
    prefix: &'static str,
    pool: u32,
) -> impl Fn(&mut SmallRng) -> String + Send + Sync + 'static {
    let pool = pool.max(1);
    move |rng| format!("{prefix}{}", rng.gen_range(0..pool))
}

/// Decimal integer literals drawn uniformly from `range`. An empty range
/// always yields its start.
pub fn int_literal(
    range: RangeInclusive<i64>,
) -> impl Fn(&mut SmallRng) -> String + Send + Sync + 'static {
    move |rng| {
        if range.is_empty() {
            range.start().to_string()
        } else {
            rng.gen_range(range.clone()).to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENT: Token = Token::new("ident");
    const INT: Token = Token::new("int");
    const OTHER: Token = Token::new("other");

    #[test]
    fn test_default_text_is_token_name() {
        let gens = Generators::new();
        let mut rng = SmallRng::seed_from_u64(0);
        assert_eq!(gens.generate(OTHER, &mut rng), "other");
    }

    #[test]
    fn test_generators_are_seeded() {
        let gens = Generators::new()
            .with(IDENT, ident("x", 4))
            .with(INT, int_literal(-5..=5));
        assert!(gens.contains(IDENT));
        assert!(!gens.contains(OTHER));

        let draw = |seed| {
            let mut rng = SmallRng::seed_from_u64(seed);
            (0..8)
                .map(|_| (gens.generate(IDENT, &mut rng), gens.generate(INT, &mut rng)))
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(42), draw(42));

        for (name, value) in draw(7) {
            assert!(name.starts_with('x'));
            let value: i64 = value.parse().unwrap();
            assert!((-5..=5).contains(&value));
        }
    }

    #[test]
    fn test_empty_int_range_yields_start() {
        let gens = Generators::new().with(INT, int_literal(5..=1));
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..4 {
            assert_eq!(gens.generate(INT, &mut rng), "5");
        }
    }
}
