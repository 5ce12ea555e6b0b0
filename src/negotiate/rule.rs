//! Ordered rule chains.
//!
//! A chain is a list of `(condition, action)` pairs evaluated top to bottom
//! plus a mandatory fallback, so every chain produces exactly one action.

use tracing::debug;

use crate::core::resolved::RuleHit;
use crate::core::signal::Signals;
use crate::negotiate::cond::Cond;

/// A single rule: when `cond` holds, `action` is taken.
#[derive(Debug, Clone)]
pub struct Rule<A> {
    pub cond: Cond,
    pub action: A,
}

impl<A> Rule<A> {
    pub fn new(cond: Cond, action: A) -> Self {
        Rule { cond, action }
    }
}

/// An ordered, total list of rules.
#[derive(Debug, Clone)]
pub struct RuleChain<A> {
    name: &'static str,
    rules: Vec<Rule<A>>,
    fallback: A,
}

impl<A> RuleChain<A> {
    /// Start a chain that falls back to `fallback` when no rule matches.
    pub fn new(name: &'static str, fallback: A) -> Self {
        RuleChain {
            name,
            rules: Vec::new(),
            fallback,
        }
    }

    /// Append a rule.
    pub fn rule(mut self, cond: Cond, action: A) -> Self {
        self.rules.push(Rule::new(cond, action));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn rules(&self) -> &[Rule<A>] {
        &self.rules
    }

    pub fn fallback(&self) -> &A {
        &self.fallback
    }

    /// Pick the first matching rule's action, or the fallback.
    pub fn evaluate(&self, signals: &Signals) -> (&A, RuleHit) {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.cond.eval(signals) {
                debug!("{}: rule {} matched ({})", self.name, index, rule.cond);
                return (
                    &rule.action,
                    RuleHit {
                        index: Some(index),
                        condition: rule.cond.to_string(),
                    },
                );
            }
        }
        debug!("{}: fallback", self.name);
        (
            &self.fallback,
            RuleHit {
                index: None,
                condition: "fallback".to_string(),
            },
        )
    }
}
