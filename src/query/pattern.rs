use crate::core::{StoreError, StoreResult};
use lru::LruCache;
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

const REGEX_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(200) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

lazy_static::lazy_static! {
    static ref REGEX_LRU_CACHE: Mutex<LruCache<String, Arc<Regex>>> =
        Mutex::new(LruCache::new(REGEX_CACHE_SIZE));
}

/// Translate a LIKE pattern into an anchored regex
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => regex.push_str(&regex::escape(&escaped.to_string())),
                None => regex.push_str(r"\\"),
            },
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }

    regex.push('$');
    regex
}

/// Patterns with at most a leading and a trailing `%` need no regex
fn fast_path_like(text: &str, pattern: &str, case_sensitive: bool) -> Option<bool> {
    if pattern.contains('_') || pattern.contains('\\') {
        return None;
    }

    let leading = pattern.starts_with('%');
    let trailing = pattern.len() > 1 && pattern.ends_with('%');
    let core = pattern.strip_prefix('%').unwrap_or(pattern);
    let core = if trailing {
        core.strip_suffix('%').unwrap_or(core)
    } else {
        core
    };

    if core.contains('%') {
        return None;
    }

    let (text, core): (Cow<'_, str>, Cow<'_, str>) = if case_sensitive {
        (Cow::Borrowed(text), Cow::Borrowed(core))
    } else {
        (Cow::Owned(text.to_lowercase()), Cow::Owned(core.to_lowercase()))
    };
    let core = core.as_ref();

    Some(match (leading, trailing) {
        (false, false) => text == core,
        (false, true) => text.starts_with(core),
        (true, false) => text.ends_with(core),
        (true, true) => text.contains(core),
    })
}

fn get_or_compile_regex(pattern: &str, case_sensitive: bool) -> StoreResult<Arc<Regex>> {
    let cache_key = if case_sensitive {
        format!("s:{}", pattern)
    } else {
        format!("i:{}", pattern)
    };

    {
        let mut cache = REGEX_LRU_CACHE
            .lock()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        if let Some(regex) = cache.get(&cache_key) {
            return Ok(Arc::clone(regex));
        }
    }

    let compiled = RegexBuilder::new(&like_to_regex(pattern))
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| StoreError::InvalidQuery(format!("Invalid LIKE pattern: {}", e)))?;
    let compiled = Arc::new(compiled);

    let mut cache = REGEX_LRU_CACHE
        .lock()
        .map_err(|e| StoreError::Database(e.to_string()))?;
    cache.put(cache_key, Arc::clone(&compiled));

    Ok(compiled)
}

/// Evaluate `text LIKE pattern`
pub fn eval_like(text: &str, pattern: &str, case_sensitive: bool) -> StoreResult<bool> {
    if let Some(result) = fast_path_like(text, pattern, case_sensitive) {
        return Ok(result);
    }

    let regex = get_or_compile_regex(pattern, case_sensitive)?;
    Ok(regex.is_match(text))
}
