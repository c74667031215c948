//! Debt simplification.
//!
//! Greedy netting over member balances: repeatedly match the largest
//! debtor with the largest creditor and settle as much as possible
//! between them. Produces at most n-1 transfers for n members and runs
//! in O(n log n). Transfers under a cent are dropped.

use std::collections::HashMap;

use serde::Serialize;

use super::balances::MemberBalance;
use super::splits::round2;

#[derive(Debug, Clone, Serialize)]
pub struct Transfer {
    pub from_user_id: i32,
    pub to_user_id: i32,
    pub amount: f64,
}

/// Reduce the balance graph to a short list of settling transfers.
///
/// Example: Alice +90, Bob +40, Carol -20, Dave -60, Erin -50 settles
/// as Dave→Alice 60, Erin→Alice 30, Erin→Bob 20, Carol→Bob 20.
pub fn simplify_debts(balances: &HashMap<i32, MemberBalance>) -> Vec<Transfer> {
    let mut debtors: Vec<(i32, f64)> = balances
        .values()
        .filter(|b| b.balance < 0.0)
        .map(|b| (b.user_id, b.balance.abs()))
        .collect();

    let mut creditors: Vec<(i32, f64)> = balances
        .values()
        .filter(|b| b.balance > 0.0)
        .map(|b| (b.user_id, b.balance))
        .collect();

    // Largest first; ties broken by user id so output is deterministic
    debtors.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    creditors.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut transfers = Vec::new();
    let mut i = 0;
    let mut j = 0;

    while i < debtors.len() && j < creditors.len() {
        let settle_amount = debtors[i].1.min(creditors[j].1);

        if settle_amount > 0.01 {
            transfers.push(Transfer {
                from_user_id: debtors[i].0,
                to_user_id: creditors[j].0,
                amount: round2(settle_amount),
            });
        }

        debtors[i].1 -= settle_amount;
        creditors[j].1 -= settle_amount;

        if debtors[i].1 < 0.01 {
            i += 1;
        }
        if creditors[j].1 < 0.01 {
            j += 1;
        }
    }

    transfers
}

/// The emitted transfers must move exactly the total credit, give or
/// take a cent of rounding.
pub fn validate_transfers(balances: &HashMap<i32, MemberBalance>, transfers: &[Transfer]) -> bool {
    let total_credits: f64 = balances
        .values()
        .filter(|b| b.balance > 0.0)
        .map(|b| b.balance)
        .sum();

    let total_transferred: f64 = transfers.iter().map(|t| t.amount).sum();

    (total_credits - total_transferred).abs() < 0.01
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balances(entries: &[(i32, f64)]) -> HashMap<i32, MemberBalance> {
        entries
            .iter()
            .map(|(user_id, balance)| {
                (
                    *user_id,
                    MemberBalance {
                        user_id: *user_id,
                        total_paid: balance.max(0.0),
                        total_owed: (-balance).max(0.0),
                        balance: *balance,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn two_party_debt_settles_in_one_transfer() {
        let b = balances(&[(1, 25.0), (2, -25.0)]);
        let transfers = simplify_debts(&b);

        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].from_user_id, 2);
        assert_eq!(transfers[0].to_user_id, 1);
        assert_eq!(transfers[0].amount, 25.0);
        assert!(validate_transfers(&b, &transfers));
    }

    #[test]
    fn greedy_matching_pairs_largest_first() {
        // Alice +90, Bob +40, Carol -20, Dave -60, Erin -50
        let b = balances(&[(1, 90.0), (2, 40.0), (3, -20.0), (4, -60.0), (5, -50.0)]);
        let transfers = simplify_debts(&b);

        assert_eq!(transfers.len(), 4);
        assert_eq!(
            (transfers[0].from_user_id, transfers[0].to_user_id, transfers[0].amount),
            (4, 1, 60.0)
        );
        assert_eq!(
            (transfers[1].from_user_id, transfers[1].to_user_id, transfers[1].amount),
            (5, 1, 30.0)
        );
        assert!(validate_transfers(&b, &transfers));
    }

    #[test]
    fn chain_of_debts_collapses() {
        // A owes B, B owes C the same amount: B nets to zero, one transfer remains
        let b = balances(&[(1, -10.0), (2, 0.0), (3, 10.0)]);
        let transfers = simplify_debts(&b);

        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].from_user_id, 1);
        assert_eq!(transfers[0].to_user_id, 3);
    }

    #[test]
    fn settled_group_needs_no_transfers() {
        let b = balances(&[(1, 0.0), (2, 0.0)]);
        assert!(simplify_debts(&b).is_empty());
        assert!(simplify_debts(&HashMap::new()).is_empty());
    }

    #[test]
    fn sub_cent_residue_is_dropped() {
        let b = balances(&[(1, 0.005), (2, -0.005)]);
        assert!(simplify_debts(&b).is_empty());
    }

    #[test]
    fn transfer_count_is_at_most_members_minus_one() {
        let b = balances(&[(1, 50.0), (2, 25.0), (3, -25.0), (4, -25.0), (5, -25.0)]);
        let transfers = simplify_debts(&b);
        assert!(transfers.len() <= 4);
        assert!(validate_transfers(&b, &transfers));
    }
}
