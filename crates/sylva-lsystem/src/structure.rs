//! Tree structure recovered from a flat derived string.
//!
//! The derived string is a pre-order walk of the plant with brackets marking
//! subtrees. [`BranchStructure`] answers the structural questions operations
//! ask about it (nesting level, matching bracket, whether a deeper leaf
//! follows) in constant time after one linear pass.

/// How one symbol affects nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolKind {
    Push,
    Pop,
    Leaf,
    Other,
}

/// Per-position structural facts about a derived string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchStructure {
    /// `levels[i]` is the nesting level in effect when symbol `i` runs, and
    /// `levels[len]` the level after the last symbol.
    levels: Vec<i64>,
    /// Matching bracket for every push and pop that has a partner.
    partners: Vec<Option<usize>>,
    deeper_leaf_ahead: Vec<bool>,
}

impl BranchStructure {
    /// Analyzes `symbols`.
    ///
    /// `is_push` and `is_pop` classify branch open and close symbols;
    /// `leaf_marker` is the symbol the leaf look-ahead searches for. A symbol
    /// that is both a push and something else counts as a push, and a leaf
    /// marker that is also a pop counts as a leaf. `initial_depth` is the
    /// level before the first symbol.
    pub fn analyze(
        symbols: &[char],
        is_push: impl Fn(char) -> bool,
        is_pop: impl Fn(char) -> bool,
        leaf_marker: char,
        initial_depth: u32,
    ) -> Self {
        let kinds: Vec<SymbolKind> = symbols
            .iter()
            .map(|&symbol| {
                if is_push(symbol) {
                    SymbolKind::Push
                } else if symbol == leaf_marker {
                    SymbolKind::Leaf
                } else if is_pop(symbol) {
                    SymbolKind::Pop
                } else {
                    SymbolKind::Other
                }
            })
            .collect();

        let len = kinds.len();
        let mut levels = Vec::with_capacity(len + 1);
        let mut partners = vec![None; len];
        let mut open = Vec::new();
        let mut level = i64::from(initial_depth);
        levels.push(level);

        for (i, kind) in kinds.iter().enumerate() {
            match kind {
                SymbolKind::Push => {
                    level += 1;
                    open.push(i);
                }
                SymbolKind::Pop => {
                    level -= 1;
                    if let Some(start) = open.pop() {
                        partners[start] = Some(i);
                        partners[i] = Some(start);
                    }
                }
                SymbolKind::Leaf | SymbolKind::Other => {}
            }
            levels.push(level);
        }

        // A forward scan from `i` starts at the level after symbol `i`, walks
        // `i + 1..` and stops once the level after a symbol drops to zero or
        // below. It succeeds on the first leaf seen above its starting level.
        // Walking backwards, `deepest` holds the highest leaf level reachable
        // from the current position before such a stop.
        let mut deeper_leaf_ahead = vec![false; len];
        let mut deepest: Option<i64> = None;
        for i in (0..len).rev() {
            if levels.get(i + 2).is_some_and(|&after| after <= 0) {
                deepest = None;
            }
            if kinds.get(i + 1) == Some(&SymbolKind::Leaf) {
                let at = levels[i + 1];
                deepest = Some(deepest.map_or(at, |d| d.max(at)));
            }
            deeper_leaf_ahead[i] = deepest.is_some_and(|d| d > levels[i + 1]);
        }

        Self {
            levels,
            partners,
            deeper_leaf_ahead,
        }
    }

    /// Number of analyzed symbols.
    pub fn len(&self) -> usize {
        self.deeper_leaf_ahead.len()
    }

    /// Returns `true` for an empty string.
    pub fn is_empty(&self) -> bool {
        self.deeper_leaf_ahead.is_empty()
    }

    /// Nesting level in effect when the symbol at `index` runs.
    pub fn level(&self, index: usize) -> Option<i64> {
        if index < self.len() {
            self.levels.get(index).copied()
        } else {
            None
        }
    }

    /// Nesting level after the last symbol.
    pub fn final_level(&self) -> i64 {
        self.levels.last().copied().unwrap_or_default()
    }

    /// Matching bracket of the push or pop at `index`.
    pub fn partner(&self, index: usize) -> Option<usize> {
        self.partners.get(index).copied().flatten()
    }

    /// Whether a leaf marker follows `index` at a level deeper than the one
    /// after `index`, before the level drops to zero.
    pub fn deeper_leaf_ahead(&self, index: usize) -> bool {
        self.deeper_leaf_ahead.get(index).copied().unwrap_or(false)
    }

    /// Returns `true` if every pop has a matching push and nothing is left
    /// open.
    pub fn is_balanced(&self) -> bool {
        let Some(&start) = self.levels.first() else {
            return true;
        };
        self.final_level() == start && self.levels.iter().all(|&level| level >= start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(text: &str, initial_depth: u32) -> (Vec<char>, BranchStructure) {
        let symbols: Vec<char> = text.chars().collect();
        let structure =
            BranchStructure::analyze(&symbols, |c| c == '[', |c| c == ']', 'l', initial_depth);
        (symbols, structure)
    }

    /// Straight forward scan, one walk per position.
    fn scan_from(symbols: &[char], index: usize, depth: i64) -> bool {
        let mut level = depth;
        for &symbol in &symbols[index + 1..] {
            if symbol == '[' {
                level += 1;
            } else if symbol == 'l' {
                if level > depth {
                    return true;
                }
            } else if symbol == ']' {
                level -= 1;
            }
            if level <= 0 {
                return false;
            }
        }
        false
    }

    fn lcg(seed: &mut u64) -> u64 {
        *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        *seed >> 33
    }

    #[test]
    fn test_levels_and_partners() {
        let (_, structure) = analyze("F[A[B]]C", 1);
        assert_eq!(structure.level(0), Some(1));
        assert_eq!(structure.level(2), Some(2));
        assert_eq!(structure.level(4), Some(3));
        assert_eq!(structure.level(7), Some(1));
        assert_eq!(structure.level(8), None);
        assert_eq!(structure.partner(1), Some(6));
        assert_eq!(structure.partner(6), Some(1));
        assert_eq!(structure.partner(3), Some(5));
        assert_eq!(structure.partner(0), None);
        assert!(structure.is_balanced());
    }

    #[test]
    fn test_unbalanced() {
        let (_, structure) = analyze("F]", 1);
        assert!(!structure.is_balanced());
        assert_eq!(structure.partner(1), None);

        let (_, structure) = analyze("[F", 1);
        assert!(!structure.is_balanced());
    }

    #[test]
    fn test_empty_structures_are_balanced() {
        let structure = BranchStructure::default();
        assert!(structure.is_empty());
        assert!(structure.is_balanced());
        assert_eq!(structure.final_level(), 0);

        let (_, structure) = analyze("", 1);
        assert!(structure.is_balanced());
        assert_eq!(structure.final_level(), 1);
    }

    #[test]
    fn test_deeper_leaf_ahead() {
        // Leaf at 0 runs at level 1; the leaf inside the bracket is at 2.
        let (_, structure) = analyze("l[l]", 1);
        assert!(structure.deeper_leaf_ahead(0));
        assert!(!structure.deeper_leaf_ahead(2));

        // A later leaf at the same level does not count.
        let (_, structure) = analyze("[l]l", 1);
        assert!(!structure.deeper_leaf_ahead(1));
    }

    #[test]
    fn test_scan_stops_at_level_zero() {
        // Initial depth 1: closing once drops the scan to zero.
        let (_, structure) = analyze("l][[l]]", 1);
        assert!(!structure.deeper_leaf_ahead(0));
    }

    #[test]
    fn test_matches_forward_scan() {
        let alphabet = ['[', ']', 'l', 'F', 'S'];
        let mut seed = 99u64;
        for round in 0..300 {
            let len = 1 + (lcg(&mut seed) % 40) as usize;
            let text: String = (0..len)
                .map(|_| alphabet[(lcg(&mut seed) % alphabet.len() as u64) as usize])
                .collect();
            let initial_depth = (round % 3) as u32 + 1;
            let (symbols, structure) = analyze(&text, initial_depth);

            for i in 0..symbols.len() {
                let level = structure.levels[i + 1];
                assert_eq!(
                    structure.deeper_leaf_ahead(i),
                    scan_from(&symbols, i, level),
                    "mismatch at {} in {:?} (initial depth {})",
                    i,
                    text,
                    initial_depth
                );
            }
        }
    }
}
