//! Expansion of compact Jπ expressions into explicit candidate states.
//!
//! Accepted forms (combinable):
//!
//! * `2+`, `3/2-`, `1.5+`       single state
//! * `(2)+`, `2(+)`, `(2+)`     tentative spin and/or parity
//! * `1/2:7/2`                  every spin in the range, step 1
//! * `1+,2-`                    list; each item keeps only its own parity
//! * `(1,2)+`, `(1,2)(-)`       tentative list sharing a parity suffix
//! * `(1,2)`                    tentative list, no shared parity
//!
//! Items that cannot be read are dropped; the rest of the expression is kept.

use crate::data::model::{Parity, SpinParityState};

/// Largest `2J` a range may reach. Anything wider is not a physical
/// assignment.
pub const MAX_RANGE_TWO_TIMES_SPIN: u32 = 200;

/// Expand a raw Jπ expression. Blank or unreadable input yields no states.
pub fn expand_spin_parity(text: &str) -> Vec<SpinParityState> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    if let Some((inner, suffix)) = split_group(text) {
        let suffix = suffix.trim();
        let shared = if suffix.is_empty() {
            Some(None)
        } else {
            parse_parity_token(suffix).map(Some)
        };
        if let Some(shared) = shared {
            return expand_group(inner, shared);
        }
    }

    split_items(text).flat_map(parse_item).collect()
}

/// `(x, y)` optionally followed by a shared parity `(parity, tentative)`.
///
/// Every element becomes tentative in spin. Parity written inside the
/// parentheses is tentative too; the shared suffix only fills items that
/// carry no parity of their own.
fn expand_group(inner: &str, shared: Option<(Parity, bool)>) -> Vec<SpinParityState> {
    split_items(inner)
        .flat_map(parse_item)
        .map(|mut state| {
            state.is_tentative_spin = state.two_times_spin.is_some();
            if state.parity.is_some() {
                state.is_tentative_parity = true;
            } else if let Some((parity, tentative)) = shared {
                state.parity = Some(parity);
                state.is_tentative_parity = tentative;
            }
            state
        })
        .collect()
}

fn split_items(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Parse one list item, which may itself be a range.
fn parse_item(item: &str) -> Vec<SpinParityState> {
    let mut body = item.trim();
    let mut tentative_spin = false;
    let mut tentative_parity = false;

    // "(3/2+)" – everything inside is tentative.
    if let Some(inner) = strip_wrapping_parens(body) {
        body = inner.trim();
        tentative_spin = true;
        tentative_parity = true;
    }

    let (spin_text, parity) = match strip_parity_suffix(body) {
        Some((rest, parity, tentative)) => {
            tentative_parity |= tentative;
            (rest.trim(), Some(parity))
        }
        None => (body, None),
    };

    // "(2)+" – parenthesized spin with a firm parity.
    let spin_text = match strip_wrapping_parens(spin_text) {
        Some(inner) => {
            tentative_spin = true;
            inner.trim()
        }
        None => spin_text,
    };

    let make = |two_times_spin: Option<u32>| SpinParityState {
        two_times_spin,
        parity,
        is_tentative_spin: tentative_spin && two_times_spin.is_some(),
        is_tentative_parity: tentative_parity && parity.is_some(),
    };

    if spin_text.is_empty() {
        return match parity {
            Some(_) => vec![make(None)],
            None => Vec::new(),
        };
    }

    if let Some((lo, hi)) = spin_text.split_once(':') {
        return match (parse_spin(lo), parse_spin(hi)) {
            (Some(lo), Some(hi)) => {
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                if hi > MAX_RANGE_TWO_TIMES_SPIN {
                    log::trace!("dropping spin range '{item}' beyond 2J = {MAX_RANGE_TWO_TIMES_SPIN}");
                    return Vec::new();
                }
                (lo..=hi).step_by(2).map(|j2| make(Some(j2))).collect()
            }
            _ => {
                log::trace!("dropping unreadable spin range '{item}'");
                Vec::new()
            }
        };
    }

    match parse_spin(spin_text) {
        Some(j2) => vec![make(Some(j2))],
        None => {
            log::trace!("dropping unreadable spin item '{item}'");
            Vec::new()
        }
    }
}

/// Parse a spin magnitude (`2`, `3/2`, `1.5`) into twice its value.
pub fn parse_spin(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some((num, den)) = text.split_once('/') {
        let doubled = num.trim().parse::<u32>().ok()?.checked_mul(2)?;
        let den: u32 = den.trim().parse().ok()?;
        if den == 0 || doubled % den != 0 {
            return None;
        }
        return Some(doubled / den);
    }
    if text.contains('.') {
        let value: f64 = text.parse().ok()?;
        let doubled = value * 2.0;
        if value < 0.0 || doubled > f64::from(u32::MAX) || (doubled - doubled.round()).abs() > 1e-6 {
            return None;
        }
        return Some(doubled.round() as u32);
    }
    text.parse::<u32>().ok()?.checked_mul(2)
}

/// `+`, `-`, `(+)` or `(-)` as `(parity, tentative)`.
fn parse_parity_token(token: &str) -> Option<(Parity, bool)> {
    let token = token.trim();
    if let Some(inner) = strip_wrapping_parens(token) {
        let mut chars = inner.trim().chars();
        let parity = Parity::from_symbol(chars.next()?)?;
        return chars.next().is_none().then_some((parity, true));
    }
    let mut chars = token.chars();
    let parity = Parity::from_symbol(chars.next()?)?;
    chars.next().is_none().then_some((parity, false))
}

/// Split a trailing parity token off `text`: `"3/2(-)"` → `("3/2", -, true)`.
fn strip_parity_suffix(text: &str) -> Option<(&str, Parity, bool)> {
    for (token, parity) in [("(+)", Parity::Positive), ("(-)", Parity::Negative)] {
        if let Some(rest) = text.strip_suffix(token) {
            return Some((rest, parity, true));
        }
    }
    let last = text.chars().last()?;
    let parity = Parity::from_symbol(last)?;
    Some((&text[..text.len() - 1], parity, false))
}

/// If `text` starts with `(`, return the contents of that group and whatever
/// follows its matching `)`.
fn split_group(text: &str) -> Option<(&str, &str)> {
    if !text.starts_with('(') {
        return None;
    }
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some((&text[1..i], &text[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

/// `"(x)"` → `"x"` when the outer parentheses enclose the whole text.
fn strip_wrapping_parens(text: &str) -> Option<&str> {
    match split_group(text) {
        Some((inner, rest)) if rest.is_empty() => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spins(states: &[SpinParityState]) -> Vec<Option<u32>> {
        states.iter().map(|s| s.two_times_spin).collect()
    }

    #[test]
    fn blank_is_unknown() {
        assert!(expand_spin_parity("").is_empty());
        assert!(expand_spin_parity("   ").is_empty());
    }

    #[test]
    fn single_firm_state() {
        let states = expand_spin_parity("3/2-");
        assert_eq!(
            states,
            vec![SpinParityState {
                two_times_spin: Some(3),
                parity: Some(Parity::Negative),
                is_tentative_spin: false,
                is_tentative_parity: false,
            }]
        );
    }

    #[test]
    fn half_integer_range() {
        let states = expand_spin_parity("1/2:7/2");
        assert_eq!(spins(&states), vec![Some(1), Some(3), Some(5), Some(7)]);
        let values: Vec<f64> = states.iter().filter_map(|s| s.spin()).collect();
        assert_eq!(values, vec![0.5, 1.5, 2.5, 3.5]);
        assert!(states
            .iter()
            .all(|s| s.parity.is_none() && !s.is_tentative_spin && !s.is_tentative_parity));
    }

    #[test]
    fn integer_range_with_spaces() {
        assert_eq!(
            spins(&expand_spin_parity("2 : 4")),
            vec![Some(4), Some(6), Some(8)]
        );
    }

    #[test]
    fn group_with_shared_parity() {
        let states = expand_spin_parity("(1,2)+");
        assert_eq!(spins(&states), vec![Some(2), Some(4)]);
        for s in &states {
            assert!(s.is_tentative_spin);
            assert_eq!(s.parity, Some(Parity::Positive));
            assert!(!s.is_tentative_parity);
        }
    }

    #[test]
    fn group_with_tentative_shared_parity() {
        let states = expand_spin_parity("(3/2, 5/2)(-)");
        assert_eq!(spins(&states), vec![Some(3), Some(5)]);
        assert!(states
            .iter()
            .all(|s| s.parity == Some(Parity::Negative) && s.is_tentative_parity));
    }

    #[test]
    fn shared_parity_does_not_override_local() {
        let states = expand_spin_parity("(1-,2)+");
        assert_eq!(states[0].parity, Some(Parity::Negative));
        assert_eq!(states[1].parity, Some(Parity::Positive));
    }

    #[test]
    fn bare_group_has_no_backfill() {
        let states = expand_spin_parity("(1,2+)");
        assert_eq!(spins(&states), vec![Some(2), Some(4)]);
        assert!(states.iter().all(|s| s.is_tentative_spin));
        assert_eq!(states[0].parity, None);
        assert_eq!(states[1].parity, Some(Parity::Positive));
    }

    #[test]
    fn plain_list_has_no_backfill() {
        let states = expand_spin_parity("1,2+");
        assert_eq!(states[0].parity, None);
        assert_eq!(states[1].parity, Some(Parity::Positive));
        assert!(!states[0].is_tentative_spin);
    }

    #[test]
    fn item_level_tentativeness() {
        let states = expand_spin_parity("(1),2(+),(3)-");
        assert!(states[0].is_tentative_spin);
        assert_eq!(states[0].parity, None);

        assert!(!states[1].is_tentative_spin);
        assert_eq!(states[1].parity, Some(Parity::Positive));
        assert!(states[1].is_tentative_parity);

        assert!(states[2].is_tentative_spin);
        assert_eq!(states[2].parity, Some(Parity::Negative));
        assert!(!states[2].is_tentative_parity);
    }

    #[test]
    fn fully_parenthesized_state() {
        let states = expand_spin_parity("(5/2+)");
        assert_eq!(states.len(), 1);
        assert!(states[0].is_tentative_spin && states[0].is_tentative_parity);
    }

    #[test]
    fn decimal_spin() {
        assert_eq!(spins(&expand_spin_parity("2.5+")), vec![Some(5)]);
        assert!(expand_spin_parity("2.3").is_empty());
    }

    #[test]
    fn parity_only() {
        let states = expand_spin_parity("(-)");
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].two_times_spin, None);
        assert_eq!(states[0].parity, Some(Parity::Negative));
    }

    #[test]
    fn unreadable_items_are_dropped() {
        let states = expand_spin_parity("1+,GE 3,J,5/2");
        assert_eq!(spins(&states), vec![Some(2), Some(5)]);
    }

    #[test]
    fn spin_parsing() {
        assert_eq!(parse_spin("0"), Some(0));
        assert_eq!(parse_spin("7/2"), Some(7));
        assert_eq!(parse_spin("4/2"), Some(4));
        assert_eq!(parse_spin("1/3"), None);
        assert_eq!(parse_spin("1/0"), None);
        assert_eq!(parse_spin("-1"), None);
        assert_eq!(parse_spin("x"), None);
    }

    #[test]
    fn oversized_spins_are_dropped() {
        assert_eq!(parse_spin("3000000000"), None);
        assert_eq!(parse_spin("3000000001/2"), None);
        let states = expand_spin_parity("1+,3000000000");
        assert_eq!(spins(&states), vec![Some(2)]);
        assert!(expand_spin_parity("3000000001/2").is_empty());
        assert_eq!(parse_spin("3000000000.5"), None);
    }

    #[test]
    fn unphysical_ranges_are_dropped() {
        assert!(expand_spin_parity("0:100000000").is_empty());
        assert!(expand_spin_parity("0:4000000000").is_empty());
        let states = expand_spin_parity("2+,0:100000000");
        assert_eq!(spins(&states), vec![Some(4)]);
        assert_eq!(expand_spin_parity("0:100").len(), 101);
    }
}
