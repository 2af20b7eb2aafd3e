use crate::{
    cancel::CancelToken, error::EngineError, list::List, predicate::Predicate, store::Backend,
};

/// Bounded probing: `base`, then `base2`, `base3`, …
const MAX_ATTEMPTS: u32 = 1000;

impl List {
    /// Find a value for `path` that no existing document holds,
    /// starting from `base` and appending an incrementing numeric
    /// suffix (starting at 2) until the collision clears. Optional
    /// extra filters narrow the collision scope. Probing is bounded:
    /// past the cap this fails with `UniqueValueExhausted` instead of
    /// looping on a pathological backend.
    pub fn get_unique_value(
        &self,
        backend: &dyn Backend,
        path: &str,
        base: &str,
        extra: Option<&Predicate>,
        cancel: Option<&CancelToken>,
    ) -> Result<String, EngineError> {
        self.guard_registered()?;

        for attempt in 0..MAX_ATTEMPTS {
            if let Some(token) = cancel {
                token.check()?;
            }

            let candidate = if attempt == 0 {
                base.to_string()
            } else {
                format!("{base}{}", attempt + 1)
            };

            let mut collision = Predicate::eq(path, candidate.as_str());
            if let Some(extra) = extra {
                collision = collision.and(extra.clone());
            }

            if backend.count(self.key(), &collision)? == 0 {
                return Ok(candidate);
            }
        }

        Err(EngineError::UniqueValueExhausted {
            path: path.to_string(),
            base: base.to_string(),
            attempts: MAX_ATTEMPTS,
        })
    }
}

///
/// TESTS
///
