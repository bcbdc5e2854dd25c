//! Per-model token pricing for suggestion generation.
//!
//! Prompt and completion tokens are billed at different per-1K rates.
//! Unknown models fall back to the GPT-4 Turbo rates rather than erroring,
//! so a model rename never breaks metering.

use rust_decimal::Decimal;

/// Per-1K-token (prompt, completion) rates in USD.
fn rates_per_1k(model: &str) -> (Decimal, Decimal) {
    // gpt-4-turbo must be checked before the gpt-4 family.
    if model.starts_with("gpt-4-turbo") {
        (Decimal::new(1, 2), Decimal::new(3, 2)) // 0.01 / 0.03
    } else if model.starts_with("gpt-3.5-turbo") {
        (Decimal::new(1, 3), Decimal::new(2, 3)) // 0.001 / 0.002
    } else if model.starts_with("gpt-4") {
        (Decimal::new(3, 2), Decimal::new(6, 2)) // 0.03 / 0.06
    } else {
        (Decimal::new(1, 2), Decimal::new(3, 2)) // 0.01 / 0.03
    }
}

/// Cost of one completion call in USD.
#[must_use]
pub fn completion_cost(model: &str, prompt_tokens: i64, completion_tokens: i64) -> Decimal {
    let (prompt_rate, completion_rate) = rates_per_1k(model);
    (Decimal::from(prompt_tokens) * prompt_rate + Decimal::from(completion_tokens) * completion_rate)
        / Decimal::ONE_THOUSAND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpt4_turbo_rates() {
        // 1K prompt + 1K completion tokens.
        let cost = completion_cost("gpt-4-turbo-preview", 1000, 1000);
        assert_eq!(cost, Decimal::new(4, 2)); // 0.01 + 0.03
    }

    #[test]
    fn gpt4_rates() {
        let cost = completion_cost("gpt-4", 1000, 1000);
        assert_eq!(cost, Decimal::new(9, 2)); // 0.03 + 0.06
    }

    #[test]
    fn gpt35_turbo_rates() {
        let cost = completion_cost("gpt-3.5-turbo", 1000, 1000);
        assert_eq!(cost, Decimal::new(3, 3)); // 0.001 + 0.002
    }

    #[test]
    fn unknown_model_uses_turbo_rates() {
        assert_eq!(
            completion_cost("mistral-large", 1000, 1000),
            completion_cost("gpt-4-turbo-preview", 1000, 1000)
        );
    }

    #[test]
    fn cost_scales_per_token() {
        // 0.01 per 1K prompt tokens is 0.00001 per token.
        let cost = completion_cost("gpt-4-turbo-preview", 1, 0);
        assert_eq!(cost, Decimal::new(1, 5));
    }

    #[test]
    fn zero_tokens_cost_nothing() {
        assert_eq!(completion_cost("gpt-4", 0, 0), Decimal::ZERO);
    }
}
