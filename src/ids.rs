/// Source of identifiers for produced cut pieces.
pub trait IdSource: Send {
    fn next_id(&mut self, prefix: &str) -> String;
}

/// `{prefix}_1`, `{prefix}_2`, ... shared across prefixes.
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    issued: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> String {
        self.issued += 1;
        format!("{prefix}_{}", self.issued)
    }
}

impl<F> IdSource for F
where
    F: FnMut(&str) -> String + Send,
{
    fn next_id(&mut self, prefix: &str) -> String {
        self(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential() {
        let mut ids = SequentialIds::new();
        assert_eq!(ids.next_id("cut"), "cut_1");
        assert_eq!(ids.next_id("cut"), "cut_2");
        assert_eq!(ids.next_id("sheet"), "sheet_3");
    }

    #[test]
    fn test_closure_source() {
        let mut n = 100;
        let mut ids = move |p: &str| {
            n += 1;
            format!("{p}-{n}")
        };
        assert_eq!(IdSource::next_id(&mut ids, "x"), "x-101");
    }
}
