//! Balance netting over a group's expenses.
//!
//! Accumulates per-member totals (what they paid for the group vs what
//! their splits say they owe) and nets them into a single balance:
//! positive means the member gets money back, negative means they owe.

use std::collections::HashMap;

use serde::Serialize;

use super::splits::round2;

/// The slice of an expense the balance math needs.
#[derive(Debug, Clone)]
pub struct ExpenseWithShares {
    pub amount: f64,
    pub paid_by_user_id: Option<i32>,
    pub shares: Vec<ShareEntry>,
}

#[derive(Debug, Clone)]
pub struct ShareEntry {
    pub user_id: i32,
    pub amount_owed: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberBalance {
    pub user_id: i32,
    pub total_paid: f64,
    pub total_owed: f64,
    /// positive = gets back, negative = owes
    pub balance: f64,
}

/// Net every member's position across the given expenses.
pub fn calculate_group_balances(expenses: &[ExpenseWithShares]) -> HashMap<i32, MemberBalance> {
    let mut balances: HashMap<i32, MemberBalance> = HashMap::new();

    let entry = |map: &mut HashMap<i32, MemberBalance>, user_id: i32| {
        map.entry(user_id).or_insert(MemberBalance {
            user_id,
            total_paid: 0.0,
            total_owed: 0.0,
            balance: 0.0,
        });
    };

    for expense in expenses {
        if let Some(payer) = expense.paid_by_user_id {
            entry(&mut balances, payer);
            if let Some(b) = balances.get_mut(&payer) {
                b.total_paid += expense.amount;
            }
        }

        for share in &expense.shares {
            entry(&mut balances, share.user_id);
            if let Some(b) = balances.get_mut(&share.user_id) {
                b.total_owed += share.amount_owed;
            }
        }
    }

    for member in balances.values_mut() {
        member.total_paid = round2(member.total_paid);
        member.total_owed = round2(member.total_owed);
        member.balance = round2(member.total_paid - member.total_owed);
    }

    balances
}

/// A single member's balance, zero when they never appear.
pub fn user_balance(balances: &HashMap<i32, MemberBalance>, user_id: i32) -> f64 {
    balances.get(&user_id).map(|b| b.balance).unwrap_or(0.0)
}

/// What one user lent or borrowed on a single expense.
#[derive(Debug, Clone, Serialize)]
pub struct UserExpenseBalance {
    pub you_paid: f64,
    pub your_share: f64,
    pub you_lent: f64,
    pub you_borrowed: f64,
    pub display_text: String,
}

pub fn user_expense_balance(expense: &ExpenseWithShares, user_id: i32) -> UserExpenseBalance {
    let you_paid = if expense.paid_by_user_id == Some(user_id) {
        expense.amount
    } else {
        0.0
    };

    let your_share = expense
        .shares
        .iter()
        .find(|s| s.user_id == user_id)
        .map(|s| s.amount_owed)
        .unwrap_or(0.0);

    let you_lent = round2((you_paid - your_share).max(0.0));
    let you_borrowed = round2((your_share - you_paid).max(0.0));

    let display_text = if you_lent > 0.0 {
        format!("you lent {:.2}", you_lent)
    } else if you_borrowed > 0.0 {
        format!("you borrowed {:.2}", you_borrowed)
    } else if your_share > 0.0 {
        "settled".to_string()
    } else {
        "not involved".to_string()
    };

    UserExpenseBalance {
        you_paid,
        your_share,
        you_lent,
        you_borrowed,
        display_text,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceDisplay {
    pub text: String,
    pub color: &'static str,
}

/// Human-readable balance line, matching the sign convention above.
pub fn format_balance(balance: f64, currency: &str) -> BalanceDisplay {
    let symbol = match currency {
        "INR" => "₹",
        "USD" => "$",
        "EUR" => "€",
        other => return format_with_code(balance, other),
    };

    if balance > 0.0 {
        BalanceDisplay {
            text: format!("gets back {}{:.2}", symbol, balance.abs()),
            color: "green",
        }
    } else if balance < 0.0 {
        BalanceDisplay {
            text: format!("owes {}{:.2}", symbol, balance.abs()),
            color: "red",
        }
    } else {
        BalanceDisplay {
            text: "settled up".to_string(),
            color: "neutral",
        }
    }
}

fn format_with_code(balance: f64, code: &str) -> BalanceDisplay {
    if balance > 0.0 {
        BalanceDisplay {
            text: format!("gets back {:.2} {}", balance.abs(), code),
            color: "green",
        }
    } else if balance < 0.0 {
        BalanceDisplay {
            text: format!("owes {:.2} {}", balance.abs(), code),
            color: "red",
        }
    } else {
        BalanceDisplay {
            text: "settled up".to_string(),
            color: "neutral",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense(amount: f64, payer: i32, shares: &[(i32, f64)]) -> ExpenseWithShares {
        ExpenseWithShares {
            amount,
            paid_by_user_id: Some(payer),
            shares: shares
                .iter()
                .map(|(user_id, amount_owed)| ShareEntry {
                    user_id: *user_id,
                    amount_owed: *amount_owed,
                })
                .collect(),
        }
    }

    #[test]
    fn balances_net_paid_against_owed() {
        // Alice pays 90 split three ways, Bob pays 30 split three ways
        let expenses = vec![
            expense(90.0, 1, &[(1, 30.0), (2, 30.0), (3, 30.0)]),
            expense(30.0, 2, &[(1, 10.0), (2, 10.0), (3, 10.0)]),
        ];

        let balances = calculate_group_balances(&expenses);

        assert_eq!(balances[&1].total_paid, 90.0);
        assert_eq!(balances[&1].total_owed, 40.0);
        assert_eq!(balances[&1].balance, 50.0);
        assert_eq!(balances[&2].balance, -10.0);
        assert_eq!(balances[&3].balance, -40.0);

        // Group invariant: balances sum to zero
        let sum: f64 = balances.values().map(|b| b.balance).sum();
        assert_eq!(round2(sum), 0.0);
    }

    #[test]
    fn unknown_user_has_zero_balance() {
        let balances = calculate_group_balances(&[]);
        assert_eq!(user_balance(&balances, 42), 0.0);
    }

    #[test]
    fn per_expense_view_reports_lent_and_borrowed() {
        let e = expense(60.0, 1, &[(1, 20.0), (2, 20.0), (3, 20.0)]);

        let payer = user_expense_balance(&e, 1);
        assert_eq!(payer.you_paid, 60.0);
        assert_eq!(payer.your_share, 20.0);
        assert_eq!(payer.you_lent, 40.0);
        assert_eq!(payer.you_borrowed, 0.0);
        assert!(payer.display_text.starts_with("you lent"));

        let borrower = user_expense_balance(&e, 2);
        assert_eq!(borrower.you_borrowed, 20.0);
        assert!(borrower.display_text.starts_with("you borrowed"));

        let outsider = user_expense_balance(&e, 9);
        assert_eq!(outsider.display_text, "not involved");
    }

    #[test]
    fn format_balance_signs_and_currencies() {
        assert_eq!(format_balance(12.5, "USD").text, "gets back $12.50");
        assert_eq!(format_balance(-3.0, "INR").text, "owes ₹3.00");
        assert_eq!(format_balance(0.0, "USD").text, "settled up");
        assert_eq!(format_balance(-3.0, "GBP").text, "owes 3.00 GBP");
    }
}
