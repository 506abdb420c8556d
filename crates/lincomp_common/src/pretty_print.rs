use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::data::computation::{Node, Value};
use crate::data::token::{ExprToken, Intent, Token};

const TAB_SIZE: usize = 4;

fn write_indent(w: &mut impl Write, depth: usize) -> io::Result<()> {
    write!(w, "{:width$}", "", width = depth * TAB_SIZE)
}

fn write_list<T>(
    w: &mut impl Write,
    items: &[T],
    mut write_item: impl FnMut(&mut dyn Write, &T) -> io::Result<()>,
) -> io::Result<()> {
    write!(w, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(w, ", ")?;
        }
        write_item(w, item)?;
    }
    write!(w, ")")
}

/// Writes a math-level candidate, one operation per line, in execution order.
pub fn write_candidate<V: Value>(w: &mut impl Write, steps: &[Node<V>]) -> io::Result<()> {
    for step in steps.iter().filter(|step| !step.is_identity()) {
        write_indent(w, 1)?;
        write_list(w, &step.outputs, |w, v| write!(w, "{}", v))?;
        write!(w, " = {}", step.op.name())?;
        write_list(w, &step.inputs, |w, v| write!(w, "{}", v))?;
        writeln!(w)?;
    }
    Ok(())
}

/// Writes a token-level plan: its steps in execution order, then every token with its intent
/// and the values it holds over the course of the plan.
pub fn write_plan(
    w: &mut impl Write,
    steps: &[Node<ExprToken>],
    intents: &BTreeMap<Token, Intent>,
) -> io::Result<()> {
    let mut held: BTreeMap<&Token, Vec<String>> = BTreeMap::new();

    writeln!(w, "steps:")?;
    let mut num = 0;
    for step in steps {
        for value in step.inputs.iter().chain(&step.outputs) {
            let exprs = held.entry(&value.token).or_default();
            let rendered = value.expr.to_string();
            if !exprs.contains(&rendered) {
                exprs.push(rendered);
            }
        }
        if step.is_identity() {
            continue;
        }

        num += 1;
        write_indent(w, 1)?;
        write!(w, "{:>3}. ", num)?;
        write_list(w, &step.outputs, |w, v| write!(w, "{}", v.token))?;
        write!(w, " = {}", step.op.name())?;
        write_list(w, &step.inputs, |w, v| write!(w, "{}", v.token))?;
        writeln!(w)?;
    }

    writeln!(w, "tokens:")?;
    let name_width = intents.keys().map(|t| t.as_str().len()).max().unwrap_or(0);
    for (token, intent) in intents {
        write_indent(w, 1)?;
        write!(
            w,
            "{:<width$}  {:<5}  ",
            token.as_str(),
            intent.as_str(),
            width = name_width
        )?;
        let exprs = held.get(token).map(Vec::as_slice).unwrap_or(&[]);
        writeln!(w, "{}", exprs.join(" -> "))?;
    }

    Ok(())
}
