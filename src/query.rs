//! Search strings for the actuals list, e.g.
//! `team:Finance,Marketing amount:>500 cat:"IT Support" travel`.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::models::ActualRecord;

fn filter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(team|cat|category|half|year|month|amount):(?:"([^"]*)"|(\S+))"#)
            .expect("invalid filter regex")
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum AmountOp {
    Above(Decimal),
    Below(Decimal),
    /// Inclusive on both ends.
    Between(Decimal, Decimal),
    Equals(Decimal),
}

impl AmountOp {
    fn matches(&self, amount: Decimal) -> bool {
        match self {
            AmountOp::Above(x) => amount > *x,
            AmountOp::Below(x) => amount < *x,
            AmountOp::Between(lo, hi) => amount >= *lo && amount <= *hi,
            AmountOp::Equals(x) => amount == *x,
        }
    }
}

impl FromStr for AmountOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let num = |v: &str| {
            Decimal::from_str(v.trim().trim_start_matches('$').replace(',', "").as_str())
                .map_err(|_| format!("Invalid amount filter: {s}"))
        };
        if let Some(v) = s.strip_prefix('>') {
            return Ok(AmountOp::Above(num(v)?));
        }
        if let Some(v) = s.strip_prefix('<') {
            return Ok(AmountOp::Below(num(v)?));
        }
        if let Some((lo, hi)) = s.split_once('-') {
            let (lo, hi) = (num(lo)?, num(hi)?);
            return Ok(AmountOp::Between(lo.min(hi), lo.max(hi)));
        }
        Ok(AmountOp::Equals(num(s)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Any of the listed names is a substring of one of the record's teams.
    Team(Vec<String>),
    Category(String),
    Half(String),
    Year(String),
    Month(String),
    Amount(AmountOp),
}

impl Filter {
    fn matches(&self, r: &ActualRecord) -> bool {
        match self {
            Filter::Team(names) => names.iter().any(|n| {
                r.teams.iter().any(|t| t.to_lowercase().contains(n.as_str()))
            }),
            Filter::Category(c) => r.category.to_lowercase().contains(c.as_str()),
            Filter::Half(h) => r.half.as_str().eq_ignore_ascii_case(h),
            Filter::Year(y) => r.year.to_string() == *y,
            Filter::Month(m) => {
                r.period == *m || r.period.split_once('-').is_some_and(|(_, mm)| mm == m)
            }
            Filter::Amount(op) => op.matches(r.amount),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    /// Whatever is left once the `field:value` tokens are removed, lowercased.
    pub text: String,
}

impl Query {
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut filters = Vec::new();
        for caps in filter_re().captures_iter(input) {
            let field = caps[1].to_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().trim())
                .unwrap_or_default();
            let lower = value.to_lowercase();
            let filter = match field.as_str() {
                "team" => Filter::Team(
                    lower
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect(),
                ),
                "cat" | "category" => Filter::Category(lower),
                "half" => Filter::Half(lower),
                "year" => Filter::Year(lower),
                "month" => Filter::Month(lower),
                _ => Filter::Amount(value.parse()?),
            };
            filters.push(filter);
        }

        let rest = filter_re().replace_all(input, " ");
        let text = rest.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        Ok(Self { filters, text })
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.text.is_empty()
    }

    pub fn matches(&self, r: &ActualRecord) -> bool {
        self.filters.iter().all(|f| f.matches(r)) && self.matches_text(r)
    }

    fn matches_text(&self, r: &ActualRecord) -> bool {
        if self.text.is_empty() {
            return true;
        }
        let haystacks = [
            r.description.to_lowercase(),
            r.category.to_lowercase(),
            r.teams.join(", ").to_lowercase(),
            r.period.clone(),
            r.half.as_str().to_lowercase(),
            r.amount.to_string(),
        ];
        haystacks.iter().any(|h| h.contains(&self.text))
    }
}
