//! Filter-graph assembled as a tree of labeled nodes, not a string built up
//! in place — see the design note on why: ordering bugs in string assembly
//! are invisible until you run ffmpeg, ordering bugs in a `Vec<FilterChain>`
//! are visible in an assertion.

/// One filter invocation: N input labels, a filter expression (without the
/// surrounding brackets), and the output label(s) it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChain {
    pub inputs: Vec<String>,
    pub filter: String,
    pub outputs: Vec<String>,
}

impl FilterChain {
    pub fn new(inputs: Vec<String>, filter: impl Into<String>, outputs: Vec<String>) -> Self {
        Self {
            inputs,
            filter: filter.into(),
            outputs,
        }
    }

    /// Convenience for the common one-input, one-output case.
    pub fn simple(input: impl Into<String>, filter: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(vec![input.into()], filter, vec![output.into()])
    }

    fn serialize(&self) -> String {
        let ins: String = self.inputs.iter().map(|l| format!("[{l}]")).collect();
        let outs: String = self.outputs.iter().map(|l| format!("[{l}]")).collect();
        format!("{ins}{}{outs}", self.filter)
    }
}

/// An ordered sequence of filter chains, serialized to a single
/// `-filter_complex` string at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterGraph {
    chains: Vec<FilterChain>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chain: FilterChain) {
        self.chains.push(chain);
    }

    pub fn chains(&self) -> &[FilterChain] {
        &self.chains
    }

    pub fn to_filter_complex_string(&self) -> String {
        self.chains.iter().map(FilterChain::serialize).collect::<Vec<_>>().join(";")
    }
}

/// Deterministic, stable label allocator. Labels are derived from indices,
/// never random, so two compiles of the same timeline produce byte-identical
/// labels (§8 invariant 6).
#[derive(Debug, Default)]
pub struct LabelAllocator {
    counters: std::collections::HashMap<&'static str, u32>,
}

impl LabelAllocator {
    pub fn next(&mut self, prefix: &'static str) -> String {
        let counter = self.counters.entry(prefix).or_insert(0);
        let label = format!("{prefix}{counter}");
        *counter += 1;
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_brackets_around_each_label() {
        let chain = FilterChain::new(
            vec!["0:v".to_string(), "1:v".to_string()],
            "overlay=10:10".to_string(),
            vec!["vout".to_string()],
        );
        let mut graph = FilterGraph::new();
        graph.push(chain);
        assert_eq!(graph.to_filter_complex_string(), "[0:v][1:v]overlay=10:10[vout]");
    }

    #[test]
    fn joins_multiple_chains_with_semicolons() {
        let mut graph = FilterGraph::new();
        graph.push(FilterChain::simple("0:v", "trim=0:3", "t0"));
        graph.push(FilterChain::simple("t0", "scale=1080:1920", "s0"));
        assert_eq!(graph.to_filter_complex_string(), "[0:v]trim=0:3[t0];[t0]scale=1080:1920[s0]");
    }

    #[test]
    fn label_allocator_is_deterministic_across_runs() {
        let mut a = LabelAllocator::default();
        let mut b = LabelAllocator::default();
        for _ in 0..3 {
            assert_eq!(a.next("scene"), b.next("scene"));
        }
    }
}
