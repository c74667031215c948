//! Split calculation for shared expenses.
//!
//! Four strategies: equal, exact, percentage and shares. All money
//! values are f64 rounded to cents at the boundaries; sums are accepted
//! within a one-cent tolerance. Whenever cent rounding leaves a
//! residual, it is folded into the payer's split (or a deterministic
//! fallback split) and flagged as a rounding adjustment so the split
//! sum always matches the expense amount exactly.

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Tolerance for amount sums (one cent).
pub const AMOUNT_TOLERANCE: f64 = 0.01;
/// Tolerance for percentage sums.
pub const PERCENTAGE_TOLERANCE: f64 = 0.01;

/// Round to two decimal places (cents).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    Equal,
    Exact,
    Percentage,
    Shares,
}

impl SplitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitType::Equal => "equal",
            SplitType::Exact => "exact",
            SplitType::Percentage => "percentage",
            SplitType::Shares => "shares",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "equal" => Ok(SplitType::Equal),
            "exact" => Ok(SplitType::Exact),
            "percentage" => Ok(SplitType::Percentage),
            "shares" => Ok(SplitType::Shares),
            other => Err(DomainError::Validation(format!(
                "Invalid split type: {}",
                other
            ))),
        }
    }
}

/// Caller-supplied participant entry. Which optional field is required
/// depends on the split type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitParticipant {
    pub user_id: i32,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub shares: Option<f64>,
}

/// One participant's computed share of an expense.
#[derive(Debug, Clone, Serialize)]
pub struct CalculatedSplit {
    pub user_id: i32,
    pub amount_owed: f64,
    pub percentage: f64,
    pub shares: Option<f64>,
    pub calculated_amount: f64,
    pub adjustment_amount: f64,
    pub is_rounding_adjustment: bool,
}

/// Route to the strategy matching `split_type`.
pub fn calculate_splits(
    total_amount: f64,
    split_type: SplitType,
    participants: &[SplitParticipant],
    payer_id: i32,
) -> Result<Vec<CalculatedSplit>, DomainError> {
    match split_type {
        SplitType::Equal => calculate_equal_split(total_amount, participants, payer_id),
        SplitType::Exact => calculate_exact_split(total_amount, participants),
        SplitType::Percentage => calculate_percentage_split(total_amount, participants, payer_id),
        SplitType::Shares => calculate_shares_split(total_amount, participants, payer_id),
    }
}

/// Equal split. The base share is rounded down to the cent so the total
/// is never over-allocated; the sub-cent remainder goes to the payer
/// (or the first participant when the payer is not in the split).
pub fn calculate_equal_split(
    total_amount: f64,
    participants: &[SplitParticipant],
    payer_id: i32,
) -> Result<Vec<CalculatedSplit>, DomainError> {
    if participants.is_empty() {
        return Err(DomainError::Validation(
            "At least one participant is required".to_string(),
        ));
    }

    if total_amount <= 0.0 {
        return Err(DomainError::Validation(
            "Amount must be greater than 0".to_string(),
        ));
    }

    // Single participant owes the full amount
    if participants.len() == 1 {
        return Ok(vec![CalculatedSplit {
            user_id: participants[0].user_id,
            amount_owed: total_amount,
            percentage: 100.0,
            shares: None,
            calculated_amount: total_amount,
            adjustment_amount: 0.0,
            is_rounding_adjustment: false,
        }]);
    }

    let count = participants.len() as f64;
    // Round down to avoid over-allocation
    let base_amount = (total_amount * 100.0 / count).floor() / 100.0;
    let remainder = round2(total_amount - base_amount * count);

    let mut splits = Vec::with_capacity(participants.len());
    let mut remainder_assigned = false;

    for participant in participants {
        let takes_remainder =
            participant.user_id == payer_id && !remainder_assigned && remainder > 0.0;
        let adjustment = if takes_remainder { remainder } else { 0.0 };
        let final_amount = round2(base_amount + adjustment);

        if takes_remainder {
            remainder_assigned = true;
        }

        splits.push(CalculatedSplit {
            user_id: participant.user_id,
            amount_owed: final_amount,
            percentage: round2(final_amount / total_amount * 100.0),
            shares: None,
            calculated_amount: base_amount,
            adjustment_amount: adjustment,
            is_rounding_adjustment: adjustment != 0.0,
        });
    }

    // Payer not among the participants: first split absorbs the remainder
    if !remainder_assigned && remainder > 0.0 {
        let first = &mut splits[0];
        first.amount_owed = round2(first.amount_owed + remainder);
        first.adjustment_amount = remainder;
        first.is_rounding_adjustment = true;
        first.percentage = round2(first.amount_owed / total_amount * 100.0);
    }

    Ok(splits)
}

/// Exact split: amounts are caller-supplied and must sum to the total
/// within a cent.
pub fn calculate_exact_split(
    total_amount: f64,
    participants: &[SplitParticipant],
) -> Result<Vec<CalculatedSplit>, DomainError> {
    if participants.is_empty() {
        return Err(DomainError::Validation(
            "At least one participant is required".to_string(),
        ));
    }

    if participants.iter().any(|p| p.amount.is_none()) {
        return Err(DomainError::Validation(
            "All participants must have a valid amount for exact split".to_string(),
        ));
    }

    let negatives: Vec<f64> = participants
        .iter()
        .filter_map(|p| p.amount)
        .filter(|a| *a < 0.0)
        .collect();
    if !negatives.is_empty() {
        return Err(DomainError::Validation(format!(
            "Negative amounts not allowed. Found: {:?}",
            negatives
        )));
    }

    if participants.iter().all(|p| p.amount == Some(0.0)) {
        return Err(DomainError::Validation(
            "At least one participant must have an amount greater than 0".to_string(),
        ));
    }

    let sum: f64 = participants.iter().filter_map(|p| p.amount).sum();
    let difference = (sum - total_amount).abs();

    if difference > AMOUNT_TOLERANCE {
        let status = if sum > total_amount { "over" } else { "under" };
        return Err(DomainError::Validation(format!(
            "Split amounts {} by {:.2}. Total: {:.2}, Sum: {:.2}",
            status, difference, total_amount, sum
        )));
    }

    if let Some(p) = participants
        .iter()
        .find(|p| p.amount.unwrap_or(0.0) > total_amount)
    {
        return Err(DomainError::Validation(format!(
            "Individual amount cannot exceed total expense. Found: {:.2} > {:.2}",
            p.amount.unwrap_or(0.0),
            total_amount
        )));
    }

    Ok(participants
        .iter()
        .map(|p| {
            let amount = p.amount.unwrap_or(0.0);
            CalculatedSplit {
                user_id: p.user_id,
                amount_owed: amount,
                percentage: if total_amount > 0.0 {
                    round2(amount / total_amount * 100.0)
                } else {
                    0.0
                },
                shares: None,
                calculated_amount: amount,
                adjustment_amount: 0.0,
                is_rounding_adjustment: false,
            }
        })
        .collect())
}

/// Percentage split. Zero-percent participants are excluded; the
/// remaining percentages must sum to 100 within tolerance. A residual
/// cent from rounding goes to the payer, else to the largest share.
pub fn calculate_percentage_split(
    total_amount: f64,
    participants: &[SplitParticipant],
    payer_id: i32,
) -> Result<Vec<CalculatedSplit>, DomainError> {
    if participants.is_empty() {
        return Err(DomainError::Validation(
            "At least one participant is required".to_string(),
        ));
    }

    if participants.iter().any(|p| p.percentage.is_none()) {
        return Err(DomainError::Validation(
            "All participants must have a valid percentage".to_string(),
        ));
    }

    let negatives: Vec<f64> = participants
        .iter()
        .filter_map(|p| p.percentage)
        .filter(|pct| *pct < 0.0)
        .collect();
    if !negatives.is_empty() {
        return Err(DomainError::Validation(format!(
            "Negative percentages not allowed. Found: {:?}",
            negatives
        )));
    }

    if let Some(p) = participants.iter().find(|p| p.percentage.unwrap_or(0.0) > 100.0) {
        return Err(DomainError::Validation(format!(
            "Individual percentage cannot exceed 100%. Found: {}%",
            p.percentage.unwrap_or(0.0)
        )));
    }

    let valid: Vec<&SplitParticipant> = participants
        .iter()
        .filter(|p| p.percentage.unwrap_or(0.0) > 0.0)
        .collect();

    if valid.is_empty() {
        return Err(DomainError::Validation(
            "At least one participant must have a percentage greater than 0%".to_string(),
        ));
    }

    let total_percentage: f64 = valid.iter().filter_map(|p| p.percentage).sum();
    let percentage_difference = (total_percentage - 100.0).abs();

    if percentage_difference > PERCENTAGE_TOLERANCE {
        let status = if total_percentage > 100.0 {
            "exceed"
        } else {
            "under"
        };
        return Err(DomainError::Validation(format!(
            "Percentages {} 100% by {:.2}%. Current sum: {:.2}%",
            status, percentage_difference, total_percentage
        )));
    }

    let mut splits: Vec<CalculatedSplit> = valid
        .iter()
        .map(|p| {
            let percentage = p.percentage.unwrap_or(0.0);
            let calculated = round2(total_amount * percentage / 100.0);
            CalculatedSplit {
                user_id: p.user_id,
                amount_owed: calculated,
                percentage,
                shares: None,
                calculated_amount: calculated,
                adjustment_amount: 0.0,
                is_rounding_adjustment: false,
            }
        })
        .collect();

    apply_rounding_residual(total_amount, &mut splits, payer_id, ResidualFallback::LargestPercentage);

    Ok(splits)
}

/// Shares split: share = total × (participant shares / total shares).
/// Fractional shares are allowed; zero-share participants are excluded.
pub fn calculate_shares_split(
    total_amount: f64,
    participants: &[SplitParticipant],
    payer_id: i32,
) -> Result<Vec<CalculatedSplit>, DomainError> {
    if participants.is_empty() {
        return Err(DomainError::Validation(
            "At least one participant is required".to_string(),
        ));
    }

    if participants.iter().any(|p| p.shares.is_none()) {
        return Err(DomainError::Validation(
            "All participants must have valid shares".to_string(),
        ));
    }

    let negatives: Vec<f64> = participants
        .iter()
        .filter_map(|p| p.shares)
        .filter(|s| *s < 0.0)
        .collect();
    if !negatives.is_empty() {
        return Err(DomainError::Validation(format!(
            "Negative shares not allowed. Found: {:?}",
            negatives
        )));
    }

    let valid: Vec<&SplitParticipant> = participants
        .iter()
        .filter(|p| p.shares.unwrap_or(0.0) > 0.0)
        .collect();

    if valid.is_empty() {
        return Err(DomainError::Validation(
            "At least one participant must have shares greater than 0".to_string(),
        ));
    }

    let total_shares: f64 = valid.iter().filter_map(|p| p.shares).sum();
    let amount_per_share = total_amount / total_shares;

    let mut splits: Vec<CalculatedSplit> = valid
        .iter()
        .map(|p| {
            let shares = p.shares.unwrap_or(0.0);
            let calculated = round2(amount_per_share * shares);
            CalculatedSplit {
                user_id: p.user_id,
                amount_owed: calculated,
                percentage: round2(shares / total_shares * 100.0),
                shares: Some(shares),
                calculated_amount: calculated,
                adjustment_amount: 0.0,
                is_rounding_adjustment: false,
            }
        })
        .collect();

    apply_rounding_residual(total_amount, &mut splits, payer_id, ResidualFallback::First);

    Ok(splits)
}

enum ResidualFallback {
    /// Assign the residual to the split with the largest percentage.
    LargestPercentage,
    /// Assign the residual to the first split.
    First,
}

/// Fold the difference between the total and the allocated sum into one
/// split: the payer's if present, otherwise per the fallback rule.
fn apply_rounding_residual(
    total_amount: f64,
    splits: &mut [CalculatedSplit],
    payer_id: i32,
    fallback: ResidualFallback,
) {
    let allocated: f64 = splits.iter().map(|s| s.amount_owed).sum();
    let residual = round2(total_amount - allocated);

    if residual.abs() == 0.0 {
        return;
    }

    let index = splits
        .iter()
        .position(|s| s.user_id == payer_id)
        .unwrap_or_else(|| match fallback {
            ResidualFallback::LargestPercentage => splits
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.percentage.total_cmp(&b.percentage))
                .map(|(i, _)| i)
                .unwrap_or(0),
            ResidualFallback::First => 0,
        });

    let split = &mut splits[index];
    split.amount_owed = round2(split.amount_owed + residual);
    split.adjustment_amount = residual;
    split.is_rounding_adjustment = true;
}

/// Check a computed split set against the expense amount: no negative
/// shares, and the owed sum must match the total within a cent.
pub fn validate_splits(total_amount: f64, splits: &[CalculatedSplit]) -> Result<(), DomainError> {
    if splits.is_empty() {
        return Err(DomainError::Validation(
            "No participants in split".to_string(),
        ));
    }

    let negatives: Vec<f64> = splits
        .iter()
        .map(|s| s.amount_owed)
        .filter(|a| *a < 0.0)
        .collect();
    if !negatives.is_empty() {
        return Err(DomainError::Validation(format!(
            "Negative amounts found: {:?}",
            negatives
        )));
    }

    let sum: f64 = splits.iter().map(|s| s.amount_owed).sum();
    let difference = (sum - total_amount).abs();

    if difference > AMOUNT_TOLERANCE {
        return Err(DomainError::Validation(format!(
            "Split amounts don't match total. Difference: {:.2}",
            difference
        )));
    }

    Ok(())
}

/// Reject duplicate participants and participants outside the group.
pub fn validate_participants(
    participants: &[SplitParticipant],
    group_member_ids: &[i32],
) -> Result<(), DomainError> {
    let mut seen = Vec::with_capacity(participants.len());
    for p in participants {
        if seen.contains(&p.user_id) {
            return Err(DomainError::Validation(format!(
                "Duplicate participant: user {}",
                p.user_id
            )));
        }
        seen.push(p.user_id);
    }

    let invalid: Vec<i32> = participants
        .iter()
        .map(|p| p.user_id)
        .filter(|id| !group_member_ids.contains(id))
        .collect();

    if !invalid.is_empty() {
        return Err(DomainError::Validation(format!(
            "Invalid participants: {:?}",
            invalid
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(user_id: i32) -> SplitParticipant {
        SplitParticipant {
            user_id,
            amount: None,
            percentage: None,
            shares: None,
        }
    }

    fn with_amount(user_id: i32, amount: f64) -> SplitParticipant {
        SplitParticipant {
            amount: Some(amount),
            ..participant(user_id)
        }
    }

    fn with_percentage(user_id: i32, percentage: f64) -> SplitParticipant {
        SplitParticipant {
            percentage: Some(percentage),
            ..participant(user_id)
        }
    }

    fn with_shares(user_id: i32, shares: f64) -> SplitParticipant {
        SplitParticipant {
            shares: Some(shares),
            ..participant(user_id)
        }
    }

    fn owed_sum(splits: &[CalculatedSplit]) -> f64 {
        round2(splits.iter().map(|s| s.amount_owed).sum())
    }

    #[test]
    fn equal_split_uneven_division_assigns_remainder_to_payer() {
        let parts = vec![participant(1), participant(2), participant(3)];
        let splits = calculate_equal_split(100.0, &parts, 1).unwrap();

        assert_eq!(splits[0].amount_owed, 33.34);
        assert!(splits[0].is_rounding_adjustment);
        assert_eq!(splits[0].adjustment_amount, 0.01);
        assert_eq!(splits[1].amount_owed, 33.33);
        assert_eq!(splits[2].amount_owed, 33.33);
        assert_eq!(owed_sum(&splits), 100.0);
    }

    #[test]
    fn equal_split_payer_outside_group_falls_back_to_first() {
        let parts = vec![participant(2), participant(3), participant(4)];
        let splits = calculate_equal_split(100.0, &parts, 99).unwrap();

        assert_eq!(splits[0].amount_owed, 33.34);
        assert!(splits[0].is_rounding_adjustment);
        assert_eq!(owed_sum(&splits), 100.0);
    }

    #[test]
    fn equal_split_single_participant_owes_everything() {
        let splits = calculate_equal_split(42.5, &[participant(7)], 7).unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].amount_owed, 42.5);
        assert_eq!(splits[0].percentage, 100.0);
    }

    #[test]
    fn equal_split_even_division_has_no_adjustment() {
        let parts = vec![participant(1), participant(2)];
        let splits = calculate_equal_split(50.0, &parts, 1).unwrap();
        assert!(splits.iter().all(|s| !s.is_rounding_adjustment));
        assert!(splits.iter().all(|s| s.amount_owed == 25.0));
    }

    #[test]
    fn equal_split_rejects_empty_and_nonpositive() {
        assert!(calculate_equal_split(100.0, &[], 1).is_err());
        assert!(calculate_equal_split(0.0, &[participant(1), participant(2)], 1).is_err());
        assert!(calculate_equal_split(-5.0, &[participant(1), participant(2)], 1).is_err());
    }

    #[test]
    fn exact_split_accepts_sum_within_tolerance() {
        let parts = vec![with_amount(1, 60.0), with_amount(2, 39.995)];
        let splits = calculate_exact_split(100.0, &parts).unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].amount_owed, 60.0);
    }

    #[test]
    fn exact_split_rejects_sum_mismatch() {
        let parts = vec![with_amount(1, 60.0), with_amount(2, 39.5)];
        let err = calculate_exact_split(100.0, &parts).unwrap_err();
        assert!(err.to_string().contains("under"));
    }

    #[test]
    fn exact_split_rejects_negative_missing_and_all_zero() {
        assert!(calculate_exact_split(10.0, &[with_amount(1, -1.0), with_amount(2, 11.0)]).is_err());
        assert!(calculate_exact_split(10.0, &[with_amount(1, 10.0), participant(2)]).is_err());
        assert!(calculate_exact_split(10.0, &[with_amount(1, 0.0), with_amount(2, 0.0)]).is_err());
    }

    #[test]
    fn percentage_split_basic() {
        let parts = vec![with_percentage(1, 50.0), with_percentage(2, 30.0), with_percentage(3, 20.0)];
        let splits = calculate_percentage_split(200.0, &parts, 1).unwrap();
        assert_eq!(splits[0].amount_owed, 100.0);
        assert_eq!(splits[1].amount_owed, 60.0);
        assert_eq!(splits[2].amount_owed, 40.0);
    }

    #[test]
    fn percentage_split_excludes_zero_percent_participants() {
        let parts = vec![with_percentage(1, 100.0), with_percentage(2, 0.0)];
        let splits = calculate_percentage_split(80.0, &parts, 1).unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].user_id, 1);
    }

    #[test]
    fn percentage_split_rejects_sum_off_by_more_than_tolerance() {
        let parts = vec![with_percentage(1, 50.0), with_percentage(2, 49.9)];
        let err = calculate_percentage_split(100.0, &parts, 1).unwrap_err();
        assert!(err.to_string().contains("under"));

        // 99.99 is within the 0.01% tolerance
        let parts = vec![with_percentage(1, 50.0), with_percentage(2, 49.99)];
        assert!(calculate_percentage_split(100.0, &parts, 1).is_ok());
    }

    #[test]
    fn percentage_split_residual_goes_to_payer() {
        // 3 × round2(0.10 / 3 parts) = 0.09, residual 0.01
        let parts = vec![
            with_percentage(1, 33.33),
            with_percentage(2, 33.33),
            with_percentage(3, 33.34),
        ];
        let splits = calculate_percentage_split(0.10, &parts, 2).unwrap();
        assert_eq!(owed_sum(&splits), 0.10);
        let adjusted: Vec<&CalculatedSplit> =
            splits.iter().filter(|s| s.is_rounding_adjustment).collect();
        assert_eq!(adjusted.len(), 1);
        assert_eq!(adjusted[0].user_id, 2);
    }

    #[test]
    fn percentage_split_rejects_over_hundred_and_negative() {
        assert!(calculate_percentage_split(10.0, &[with_percentage(1, 101.0)], 1).is_err());
        assert!(
            calculate_percentage_split(10.0, &[with_percentage(1, -5.0), with_percentage(2, 105.0)], 1)
                .is_err()
        );
    }

    #[test]
    fn shares_split_proportional_amounts() {
        let parts = vec![with_shares(1, 1.0), with_shares(2, 2.0)];
        let splits = calculate_shares_split(90.0, &parts, 1).unwrap();
        assert_eq!(splits[0].amount_owed, 30.0);
        assert_eq!(splits[1].amount_owed, 60.0);
        assert_eq!(splits[0].percentage, 33.33);
    }

    #[test]
    fn shares_split_fractional_shares_and_residual() {
        let parts = vec![with_shares(1, 1.0), with_shares(2, 1.0), with_shares(3, 1.0)];
        let splits = calculate_shares_split(100.0, &parts, 3).unwrap();
        assert_eq!(owed_sum(&splits), 100.0);
        let adjusted = splits.iter().find(|s| s.is_rounding_adjustment).unwrap();
        assert_eq!(adjusted.user_id, 3);

        let parts = vec![with_shares(1, 1.5), with_shares(2, 0.5)];
        let splits = calculate_shares_split(100.0, &parts, 1).unwrap();
        assert_eq!(splits[0].amount_owed, 75.0);
        assert_eq!(splits[1].amount_owed, 25.0);
    }

    #[test]
    fn shares_split_excludes_zero_and_rejects_negative() {
        let parts = vec![with_shares(1, 2.0), with_shares(2, 0.0)];
        let splits = calculate_shares_split(50.0, &parts, 1).unwrap();
        assert_eq!(splits.len(), 1);

        assert!(calculate_shares_split(50.0, &[with_shares(1, -1.0)], 1).is_err());
    }

    #[test]
    fn validate_splits_detects_mismatch_and_negatives() {
        let parts = vec![participant(1), participant(2), participant(3)];
        let mut splits = calculate_equal_split(100.0, &parts, 1).unwrap();
        assert!(validate_splits(100.0, &splits).is_ok());

        splits[0].amount_owed += 5.0;
        assert!(validate_splits(100.0, &splits).is_err());

        splits[0].amount_owed = -1.0;
        assert!(validate_splits(100.0, &splits).is_err());

        assert!(validate_splits(100.0, &[]).is_err());
    }

    #[test]
    fn validate_participants_rejects_duplicates_and_non_members() {
        let members = vec![1, 2, 3];
        assert!(validate_participants(&[participant(1), participant(2)], &members).is_ok());
        assert!(validate_participants(&[participant(1), participant(1)], &members).is_err());
        assert!(validate_participants(&[participant(1), participant(9)], &members).is_err());
    }

    #[test]
    fn split_type_round_trips_through_strings() {
        for ty in [SplitType::Equal, SplitType::Exact, SplitType::Percentage, SplitType::Shares] {
            assert_eq!(SplitType::parse(ty.as_str()).unwrap(), ty);
        }
        assert!(SplitType::parse("thirds").is_err());
    }
}
