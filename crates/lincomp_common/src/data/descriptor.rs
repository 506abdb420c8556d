use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use crate::data::computation::MalformedGraph;
use crate::data::condition::Condition;
use crate::data::expr::{Binding, Expr, Kind};

/// A catalog entry: a primitive operation described by input and output templates over pattern
/// variables, a side condition on those variables, and an in-place contract.
///
/// `alias_map` maps an output index to the input index whose storage that output overwrites.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpDescriptor {
    name: Rc<str>,
    inputs: Vec<Expr>,
    outputs: Vec<Expr>,
    condition: Condition,
    alias_map: BTreeMap<usize, usize>,
}

impl OpDescriptor {
    pub fn new(name: impl Into<Rc<str>>, inputs: Vec<Expr>, outputs: Vec<Expr>) -> Self {
        OpDescriptor {
            name: name.into(),
            inputs,
            outputs,
            condition: Condition::True,
            alias_map: BTreeMap::new(),
        }
    }

    pub fn with_condition(self, condition: Condition) -> Self {
        OpDescriptor { condition, ..self }
    }

    pub fn with_alias(mut self, output: usize, input: usize) -> Self {
        self.alias_map.insert(output, input);
        self
    }

    /// The designated copy operation. It is never in place.
    pub fn copy() -> Self {
        let x = Expr::wild("X", Kind::Matrix);
        OpDescriptor::new("COPY", vec![x.clone()], vec![x])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[Expr] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Expr] {
        &self.outputs
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn alias_map(&self) -> &BTreeMap<usize, usize> {
        &self.alias_map
    }

    pub fn wilds(&self) -> BTreeMap<Rc<str>, Kind> {
        let mut wilds = BTreeMap::new();
        for template in self.inputs.iter().chain(&self.outputs) {
            template.collect_wilds(&mut wilds);
        }
        self.condition.collect_wilds(&mut wilds);
        wilds
    }

    pub fn output_wilds(&self) -> BTreeMap<Rc<str>, Kind> {
        let mut wilds = BTreeMap::new();
        for template in &self.outputs {
            template.collect_wilds(&mut wilds);
        }
        wilds
    }

    /// Checks the structural shape of the descriptor. Physical correctness of the underlying
    /// kernel is not (and cannot be) checked here.
    pub fn validate(&self) -> Result<(), MalformedGraph> {
        if self.outputs.is_empty() {
            return Err(MalformedGraph::NoOutputs {
                op: self.name.to_string(),
            });
        }

        let mut targets = BTreeSet::new();
        for (&output, &input) in &self.alias_map {
            if output >= self.outputs.len() || input >= self.inputs.len() {
                return Err(MalformedGraph::DanglingAlias {
                    op: self.name.to_string(),
                    output,
                    input,
                });
            }
            if !targets.insert(input) {
                return Err(MalformedGraph::SharedAliasTarget {
                    op: self.name.to_string(),
                    input,
                });
            }
        }

        // Matching the outputs is the only way a wild ever gets bound.
        let bound = self.output_wilds();
        for (wild, _) in self.wilds() {
            if !bound.contains_key(&wild) {
                return Err(MalformedGraph::UnboundWild {
                    op: self.name.to_string(),
                    wild: wild.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Derives a variant of this descriptor with some pattern variables fixed, e.g. a `GEMM`
    /// whose accumulator is the zero matrix.
    pub fn specialize(&self, suffix: &str, binding: &Binding) -> Self {
        OpDescriptor {
            name: format!("{}_{}", self.name, suffix).into(),
            inputs: self.inputs.iter().map(|e| e.subst(binding)).collect(),
            outputs: self.outputs.iter().map(|e| e.subst(binding)).collect(),
            condition: self.condition.subst(binding),
            alias_map: self.alias_map.clone(),
        }
    }
}

fn write_exprs(f: &mut fmt::Formatter<'_>, exprs: &[Expr]) -> fmt::Result {
    write!(f, "[")?;
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", expr)?;
    }
    write!(f, "]")
}

impl fmt::Display for OpDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_exprs(f, &self.inputs)?;
        write!(f, " -> {} -> ", self.name)?;
        write_exprs(f, &self.outputs)?;
        if !self.condition.is_true() {
            write!(f, " if {}", self.condition)?;
        }
        Ok(())
    }
}

/// An ordered, validated collection of operation descriptors. Iteration order is part of the
/// search order and therefore of the order in which compilations are produced.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    ops: Vec<Rc<OpDescriptor>>,
}

impl Catalog {
    pub fn new(ops: impl IntoIterator<Item = OpDescriptor>) -> Result<Self, MalformedGraph> {
        let mut catalog = Catalog::default();
        catalog.extend(ops)?;
        Ok(catalog)
    }

    pub fn extend(
        &mut self,
        ops: impl IntoIterator<Item = OpDescriptor>,
    ) -> Result<(), MalformedGraph> {
        for op in ops {
            op.validate()?;
            self.ops.push(Rc::new(op));
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<OpDescriptor>> {
        self.ops.iter()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Rc<OpDescriptor>> {
        self.ops.iter().find(|op| op.name() == name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::condition::Predicate;

    fn scale() -> OpDescriptor {
        let alpha = Expr::wild("alpha", Kind::Scalar);
        let x = Expr::wild("X", Kind::Matrix);
        OpDescriptor::new(
            "SCAL",
            vec![alpha.clone(), x.clone()],
            vec![alpha * x],
        )
        .with_alias(0, 1)
    }

    #[test]
    fn test_validate() {
        assert_eq!(scale().validate(), Ok(()));
        assert_eq!(OpDescriptor::copy().validate(), Ok(()));

        assert_eq!(
            scale().with_alias(0, 2).validate(),
            Err(MalformedGraph::DanglingAlias {
                op: "SCAL".to_owned(),
                output: 0,
                input: 2
            })
        );

        let y = Expr::wild("Y", Kind::Matrix);
        let unbound = scale().with_condition(Condition::holds(Predicate::Symmetric, y));
        assert_eq!(
            unbound.validate(),
            Err(MalformedGraph::UnboundWild {
                op: "SCAL".to_owned(),
                wild: "Y".to_owned()
            })
        );

        let no_outputs = OpDescriptor::new("NOP", vec![], vec![]);
        assert!(no_outputs.validate().is_err());
    }

    #[test]
    fn test_specialize() {
        let unit = scale().specialize("1", &Binding::new().update("alpha".into(), Expr::num(1)));
        assert_eq!(unit.name(), "SCAL_1");
        assert_eq!(unit.outputs(), &[Expr::wild("X", Kind::Matrix)]);
        assert_eq!(unit.alias_map(), scale().alias_map());
    }

    #[test]
    fn test_catalog_rejects_malformed() {
        assert!(Catalog::new([scale(), OpDescriptor::copy()]).is_ok());
        assert!(Catalog::new([scale().with_alias(3, 0)]).is_err());
    }
}
