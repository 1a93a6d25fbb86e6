use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    formatting::{escape_html, preformatted},
    templates::{TemplateId, Templates},
    Result,
};

/// Range of the decorative number shown in every header.
pub const DECOR_ID_MIN: u32 = 10_000;
pub const DECOR_ID_MAX: u32 = 99_999;

/// Source of the decorative header number. Pure noise, never persisted.
pub trait IdSource: Send + Sync {
    fn next_id(&mut self) -> u32;
}

pub struct RandomIds {
    rng: StdRng,
}

impl RandomIds {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for RandomIds {
    fn next_id(&mut self) -> u32 {
        self.rng.gen_range(DECOR_ID_MIN..=DECOR_ID_MAX)
    }
}

/// Always yields the same number.
#[derive(Clone, Copy, Debug)]
pub struct FixedId(pub u32);

impl IdSource for FixedId {
    fn next_id(&mut self) -> u32 {
        self.0
    }
}

/// Header line: `header` template with the zero-padded counter and a decorative id.
pub fn header(templates: &Templates, counter: u32, id: u32) -> Result<String> {
    let counter = format!("{counter:04}");
    let id = id.to_string();
    templates.render(TemplateId::Header, &[("counter", counter.as_str()), ("id", id.as_str())])
}

/// Anonymized repost: decorated header, then the original content verbatim.
pub fn compose(templates: &Templates, counter: u32, id: u32, content: &str) -> Result<String> {
    let head = header(templates, counter, id)?;
    Ok(format!("{}\n{}", preformatted(&head), escape_html(content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::SAMPLE;

    #[test]
    fn counter_is_zero_padded_to_four_digits() {
        let t = Templates::from_toml(SAMPLE).unwrap();
        assert_eq!(header(&t, 7, 12345).unwrap(), "Anonymous #0007 [12345]");
        assert_eq!(header(&t, 12345, 10000).unwrap(), "Anonymous #12345 [10000]");
    }

    #[test]
    fn compose_keeps_content_verbatim_after_header() {
        let t = Templates::from_toml(SAMPLE).unwrap();
        let out = compose(&t, 1, 55555, "hello <world>").unwrap();
        assert_eq!(
            out,
            "<pre>Anonymous #0001 [55555]</pre>\nhello &lt;world&gt;"
        );
    }

    #[test]
    fn random_ids_stay_in_range() {
        let mut ids = RandomIds::seeded(7);
        for _ in 0..1000 {
            let id = ids.next_id();
            assert!((DECOR_ID_MIN..=DECOR_ID_MAX).contains(&id));
        }
    }
}
