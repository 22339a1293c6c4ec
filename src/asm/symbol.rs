use fxhash::FxBuildHasher;
use indexmap::IndexMap;

type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Label -> address, in order of definition.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct SymbolTable(FxMap<String, u32>);

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable(IndexMap::with_hasher(FxBuildHasher::default()))
    }

    /// Record a definition. If the label already exists the first address is kept and returned
    /// as the error.
    pub fn define(&mut self, label: &str, addr: u32) -> Result<(), u32> {
        if let Some(&first) = self.0.get(label) {
            return Err(first);
        }
        self.0.insert(label.to_string(), addr);
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<u32> {
        self.0.get(label).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(label, addr)| (label.as_str(), *addr))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_definition_wins() {
        let mut table = SymbolTable::new();
        assert_eq!(table.define("loop", 3), Ok(()));
        assert_eq!(table.define("end", 9), Ok(()));
        assert_eq!(table.define("loop", 7), Err(3));
        assert_eq!(table.get("loop"), Some(3));
        assert_eq!(table.get("nope"), None);
        assert_eq!(
            table.iter().collect::<Vec<_>>(),
            vec![("loop", 3), ("end", 9)]
        );
    }
}
