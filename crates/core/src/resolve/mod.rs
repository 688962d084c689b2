use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::product::{Product, ProductId};
use crate::domain::rule::{Rule, RuleCondition};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// A `requires_one` relationship surfaced for the UI: advisory, satisfied
/// when any one alternative is present, never auto-expanded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftRequirement {
    pub primary: ProductId,
    pub alternatives: Vec<ProductId>,
    pub satisfied: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSelection {
    pub line_items: Vec<ResolvedLineItem>,
    pub total: Decimal,
    pub auto_added: Vec<ProductId>,
    pub soft_requirements: Vec<SoftRequirement>,
}

impl ResolvedSelection {
    /// Two-decimal value for display; internal totals keep full precision.
    pub fn display_total(&self) -> Decimal {
        self.total.round_dp(2)
    }
}

#[derive(Clone, Debug)]
struct WorkingLine {
    quantity: u32,
    auto_added: bool,
}

/// Expands a raw product selection into the final rule-consistent, priced
/// line-item set. Pure function of its inputs: identical (selection, rules,
/// catalog) always produce identical output, in the same order.
pub fn resolve(
    base_selection: &BTreeMap<ProductId, u32>,
    rule_set: &[Rule],
    catalog: &[Product],
) -> Result<ResolvedSelection, DomainError> {
    let catalog_index: BTreeMap<&str, &Product> =
        catalog.iter().map(|product| (product.id.0.as_str(), product)).collect();

    // A base selection referencing a product outside the catalog snapshot is
    // a caller contract violation, not user input to coerce.
    for product_id in base_selection.keys() {
        if !catalog_index.contains_key(product_id.0.as_str()) {
            return Err(DomainError::InvariantViolation(format!(
                "selected product {} is absent from the catalog snapshot",
                product_id.0
            )));
        }
    }

    let dependency_rules: Vec<&Rule> =
        rule_set.iter().filter(|rule| rule.is_active() && rule.is_dependency()).collect();

    detect_cycles(base_selection, &dependency_rules)?;

    let mut working: BTreeMap<ProductId, WorkingLine> = base_selection
        .iter()
        .filter(|(_, quantity)| **quantity > 0)
        .map(|(product_id, quantity)| {
            (product_id.clone(), WorkingLine { quantity: *quantity, auto_added: false })
        })
        .collect();

    // Fixed-point expansion. Hard requirements add absent products at
    // quantity 1; multiplier rules then raise quantities with ceiling
    // division. Multiplier-added products can trigger further hard
    // requirements, so both passes repeat until the set is stable. The
    // cycle check above guarantees termination.
    loop {
        let mut changed = false;

        for rule in &dependency_rules {
            if rule.condition != RuleCondition::RequiresAll {
                continue;
            }
            if !working.contains_key(&rule.primary_product_id) {
                continue;
            }
            for related in &rule.related_product_ids {
                if !working.contains_key(related) {
                    require_in_catalog(&catalog_index, related)?;
                    working.insert(
                        related.clone(),
                        WorkingLine { quantity: 1, auto_added: true },
                    );
                    changed = true;
                }
            }
        }

        for rule in &dependency_rules {
            // Multipliers only scale hard requirements; a requires_one rule
            // stays advisory even when it carries one.
            if rule.condition != RuleCondition::RequiresAll {
                continue;
            }
            let Some(every_n) = rule.multiplier else { continue };
            if every_n == 0 {
                continue;
            }
            let Some(primary) = working.get(&rule.primary_product_id) else { continue };
            let required = primary.quantity.div_ceil(every_n);
            if required == 0 {
                continue;
            }

            for related in rule.related_product_ids.clone() {
                match working.get_mut(&related) {
                    Some(line) => {
                        // Never reduce a quantity the user (or an earlier
                        // pass) already chose.
                        if line.quantity < required {
                            line.quantity = required;
                            changed = true;
                        }
                    }
                    None => {
                        require_in_catalog(&catalog_index, &related)?;
                        working.insert(
                            related.clone(),
                            WorkingLine { quantity: required, auto_added: true },
                        );
                        changed = true;
                    }
                }
            }
        }

        if !changed {
            break;
        }
    }

    // Conflicts are checked after expansion and reported, never resolved by
    // silently dropping a side.
    for rule in rule_set.iter().filter(|rule| rule.is_active()) {
        if rule.condition != RuleCondition::ConflictsWith {
            continue;
        }
        if !working.contains_key(&rule.primary_product_id) {
            continue;
        }
        if let Some(related) =
            rule.related_product_ids.iter().find(|related| working.contains_key(related))
        {
            return Err(DomainError::ConflictingSelection {
                first: rule.primary_product_id.clone(),
                second: related.clone(),
            });
        }
    }

    let soft_requirements: Vec<SoftRequirement> = dependency_rules
        .iter()
        .filter(|rule| rule.condition == RuleCondition::RequiresOne)
        .filter(|rule| working.contains_key(&rule.primary_product_id))
        .map(|rule| SoftRequirement {
            primary: rule.primary_product_id.clone(),
            alternatives: rule.related_product_ids.clone(),
            satisfied: rule
                .related_product_ids
                .iter()
                .any(|related| working.contains_key(related)),
        })
        .collect();

    // User-chosen items first (in id order), then auto-added ones, so the
    // caller can render the two groups apart.
    let mut line_items = Vec::with_capacity(working.len());
    let mut auto_added = Vec::new();
    for pass_auto in [false, true] {
        for (product_id, line) in &working {
            if line.auto_added != pass_auto {
                continue;
            }
            let product = catalog_index.get(product_id.0.as_str()).ok_or_else(|| {
                DomainError::InvariantViolation(format!(
                    "resolved line references product {} absent from the catalog snapshot",
                    product_id.0
                ))
            })?;
            let unit_price = product.base_price;
            line_items.push(ResolvedLineItem {
                product_id: product_id.clone(),
                quantity: line.quantity,
                unit_price,
                line_total: unit_price * Decimal::from(line.quantity),
            });
            if line.auto_added {
                auto_added.push(product_id.clone());
            }
        }
    }

    let total = line_items.iter().map(|line| line.line_total).sum();

    Ok(ResolvedSelection { line_items, total, auto_added, soft_requirements })
}

/// `resolve` with an audit trail of the outcome, in the same shape as the
/// lifecycle's audited apply.
pub fn resolve_with_audit<S>(
    base_selection: &BTreeMap<ProductId, u32>,
    rule_set: &[Rule],
    catalog: &[Product],
    sink: &S,
    audit: &AuditContext,
) -> Result<ResolvedSelection, DomainError>
where
    S: AuditSink,
{
    let result = resolve(base_selection, rule_set, catalog);

    match &result {
        Ok(resolved) => sink.emit(
            AuditEvent::new(
                audit.proposal_id.clone(),
                audit.tenant_id.clone(),
                audit.correlation_id.clone(),
                "resolution.completed",
                AuditCategory::Resolution,
                audit.actor.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("line_items", resolved.line_items.len().to_string())
            .with_metadata("auto_added", resolved.auto_added.len().to_string())
            .with_metadata("total", resolved.display_total().to_string()),
        ),
        Err(error) => sink.emit(
            AuditEvent::new(
                audit.proposal_id.clone(),
                audit.tenant_id.clone(),
                audit.correlation_id.clone(),
                "resolution.rejected",
                AuditCategory::Resolution,
                audit.actor.clone(),
                AuditOutcome::Rejected,
            )
            .with_metadata("error", error.to_string()),
        ),
    }

    result
}

fn require_in_catalog(
    catalog_index: &BTreeMap<&str, &Product>,
    product_id: &ProductId,
) -> Result<(), DomainError> {
    if catalog_index.contains_key(product_id.0.as_str()) {
        Ok(())
    } else {
        Err(DomainError::InvariantViolation(format!(
            "rule adds product {} absent from the catalog snapshot",
            product_id.0
        )))
    }
}

/// Depth-first cycle detection over the dependency edges, restricted to the
/// transitive closure of the base selection. Conflict rules cannot cause
/// expansion, so they never participate.
fn detect_cycles(
    base_selection: &BTreeMap<ProductId, u32>,
    dependency_rules: &[&Rule],
) -> Result<(), DomainError> {
    let mut adjacency: BTreeMap<&ProductId, Vec<&ProductId>> = BTreeMap::new();
    for rule in dependency_rules {
        adjacency
            .entry(&rule.primary_product_id)
            .or_default()
            .extend(rule.related_product_ids.iter());
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    let mut marks: BTreeMap<&ProductId, Mark> = BTreeMap::new();

    for start in base_selection.keys() {
        if marks.contains_key(start) {
            continue;
        }

        // Explicit stack; `path` mirrors the in-progress chain so a back
        // edge can name the full cycle.
        let mut stack: Vec<(&ProductId, usize)> = vec![(start, 0)];
        let mut path: Vec<&ProductId> = Vec::new();

        while let Some((node, child_index)) = stack.pop() {
            if child_index == 0 {
                marks.insert(node, Mark::InProgress);
                path.push(node);
            }

            let children = adjacency.get(node).map(Vec::as_slice).unwrap_or(&[]);
            if child_index < children.len() {
                stack.push((node, child_index + 1));
                let child = children[child_index];
                match marks.get(child) {
                    Some(Mark::InProgress) => {
                        let cycle_start =
                            path.iter().position(|entry| *entry == child).unwrap_or(0);
                        let mut product_ids: Vec<ProductId> =
                            path[cycle_start..].iter().map(|id| (*id).clone()).collect();
                        product_ids.push(child.clone());
                        return Err(DomainError::CyclicRuleGraph { product_ids });
                    }
                    Some(Mark::Done) => {}
                    None => stack.push((child, 0)),
                }
            } else {
                marks.insert(node, Mark::Done);
                path.pop();
            }
        }
    }

    Ok(())
}
