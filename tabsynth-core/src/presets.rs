//! Built-in dataset configurations.
//!
//! Each preset is a complete [`DatasetConfig`]: fields with realistic
//! ranges, the bounds a clean record keeps, and a catalog of fraud-style
//! anomalies that break those bounds. The `student-grades` and `raw-sales`
//! presets model dirty exports instead: blank cells, inconsistent letter
//! case and repeated rows.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::anomaly::LetterCase;
use crate::config::{
    AnomalyConfig, AnomalyKind, DatasetConfig, DerivedRule, FieldSource, FieldSpec, Interval,
    KindAssignment, Mutation, TargetSelection, WeightedOption,
};
use crate::error::{Result, TabSynthError};
use crate::models::{FieldKind, Value};
use crate::quality::BoundRule;

/// Name and summary of a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// All built-in presets.
pub const PRESETS: &[PresetInfo] = &[
    PresetInfo {
        name: "real-estate",
        description: "200 property transactions; price flips, undervalued sales, rapid resales and buyer volume in the last 20 rows",
    },
    PresetInfo {
        name: "school",
        description: "200 student records; ghost enrollments, duplicate identities, grade and attendance fraud, unpaid tuition and impossible ages in the last 20 rows",
    },
    PresetInfo {
        name: "ecommerce",
        description: "500 shop orders; revenue spikes, coupon abuse, refunds on one day, late-night orders and a reused customer identity on 42 random rows",
    },
    PresetInfo {
        name: "student-grades",
        description: "200 grade sheets; blank grades, lowercase sections and impossible scores on 25 random rows, plus the last 5 rows repeated",
    },
    PresetInfo {
        name: "raw-sales",
        description: "500 point-of-sale rows; inconsistent letter case, blank customers, cities and regions, and negative prices on 120 random rows",
    },
];

/// Looks up a preset by name.
///
/// # Errors
/// Returns a configuration error naming the known presets if `name` is not
/// one of them.
pub fn preset(name: &str) -> Result<DatasetConfig> {
    match name {
        "real-estate" => real_estate(),
        "school" => school(),
        "ecommerce" => ecommerce(),
        "student-grades" => student_grades(),
        "raw-sales" => raw_sales(),
        other => {
            let known: Vec<&str> = PRESETS.iter().map(|p| p.name).collect();
            Err(TabSynthError::configuration(format!(
                "unknown preset '{}' (known: {})",
                other,
                known.join(", ")
            )))
        }
    }
}

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        TabSynthError::configuration(format!("invalid date {}-{}-{}", year, month, day))
    })
}

fn amount(decimals: u32) -> FieldKind {
    FieldKind::Amount { decimals }
}

fn sequence(prefix: &str, width: usize) -> FieldSource {
    FieldSource::Sequence {
        prefix: prefix.to_string(),
        width,
        start: 1,
    }
}

fn uniform_choice<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> FieldSource {
    FieldSource::Choice {
        options: WeightedOption::uniform(values),
    }
}

fn derived(rule: DerivedRule) -> FieldSource {
    FieldSource::Derived { rule }
}

fn scaled(base: &str, lo: f64, hi: f64) -> DerivedRule {
    DerivedRule::Scaled {
        base: base.to_string(),
        lo,
        hi,
    }
}

fn set(field: &str, value: impl Into<Value>) -> Mutation {
    Mutation::Set {
        field: field.to_string(),
        value: value.into(),
    }
}

fn resample(field: &str, source: FieldSource) -> Mutation {
    Mutation::Sample {
        field: field.to_string(),
        source,
    }
}

fn rederive(field: &str, rule: DerivedRule) -> Mutation {
    Mutation::Derive {
        field: field.to_string(),
        rule,
    }
}

fn clear(field: &str) -> Mutation {
    Mutation::Clear {
        field: field.to_string(),
    }
}

fn recase(field: &str, case: LetterCase) -> Mutation {
    Mutation::Recase {
        field: field.to_string(),
        case,
    }
}

/// Every "first last" combination.
fn full_names(first: &[&str], last: &[&str]) -> Vec<String> {
    first
        .iter()
        .flat_map(|f| last.iter().map(move |l| format!("{} {}", f, l)))
        .collect()
}

const CITIES: [&str; 6] = ["Manila", "Cebu", "Davao", "Makati", "Quezon City", "Taguig"];

const FIRST_NAMES: [&str; 15] = [
    "Juan", "Maria", "Pedro", "Ana", "Jose", "Rosa", "Carlos", "Elena", "Miguel", "Sofia",
    "Diego", "Isabella", "Marco", "Liza", "Rafael",
];

const LAST_NAMES: [&str; 13] = [
    "Santos",
    "Reyes",
    "Cruz",
    "Garcia",
    "Torres",
    "Flores",
    "Rivera",
    "Ramos",
    "Lopez",
    "Gonzales",
    "Dela Cruz",
    "Villanueva",
    "Mendoza",
];

/// Real-estate transactions.
pub fn real_estate() -> Result<DatasetConfig> {
    let price_ranges: [(&str, f64, f64); 5] = [
        ("Condo", 2_000_000.0, 8_000_000.0),
        ("House & Lot", 3_000_000.0, 15_000_000.0),
        ("Townhouse", 2_500_000.0, 10_000_000.0),
        ("Vacant Lot", 500_000.0, 5_000_000.0),
        ("Commercial", 5_000_000.0, 30_000_000.0),
    ];
    let list_price = price_ranges
        .iter()
        .map(|(kind, lo, hi)| {
            (
                (*kind).to_string(),
                FieldSource::UniformFloat { lo: *lo, hi: *hi },
            )
        })
        .collect::<BTreeMap<_, _>>();

    let anomalies = AnomalyConfig::new(TargetSelection::Tail { count: 20 })
        .with_kind(
            "price_flip",
            AnomalyKind::new(vec![rederive("sold_price", scaled("listed_price", 1.5, 3.0))])
                .with_description("sold far above the listed price"),
        )?
        .with_kind(
            "undervalue",
            AnomalyKind::new(vec![rederive(
                "sold_price",
                scaled("appraised_value", 0.3, 0.5),
            )])
            .with_description("sold far below the appraisal"),
        )?
        .with_kind(
            "rapid_sale",
            AnomalyKind::new(vec![resample(
                "days_on_market",
                FieldSource::UniformInt { lo: 0, hi: 3 },
            )])
            .with_description("closed within days of listing"),
        )?
        .with_kind(
            "excess_volume",
            AnomalyKind::new(vec![resample(
                "buyer_txn_count",
                FieldSource::UniformInt { lo: 8, hi: 20 },
            )])
            .with_description("one buyer with an implausible number of purchases"),
        )?;

    Ok(DatasetConfig::new("real-estate")
        .with_records(200)
        .with_seed(42)
        .with_field(FieldSpec::new("txn_id", FieldKind::Identifier, sequence("TXN-", 4)))
        .with_field(FieldSpec::new(
            "date",
            FieldKind::Date,
            FieldSource::DateRange {
                start: date(2025, 1, 1)?,
                end: date(2025, 12, 31)?,
            },
        ))
        .with_field(FieldSpec::new("city", FieldKind::Category, uniform_choice(CITIES)))
        .with_field(FieldSpec::new(
            "property_type",
            FieldKind::Category,
            uniform_choice(price_ranges.iter().map(|(kind, _, _)| *kind)),
        ))
        .with_field(FieldSpec::new(
            "agent",
            FieldKind::Category,
            uniform_choice(["Agent_A", "Agent_B", "Agent_C", "Agent_D", "Agent_E", "Agent_F"]),
        ))
        .with_field(FieldSpec::new(
            "listed_price",
            amount(2),
            FieldSource::ByCategory {
                field: "property_type".to_string(),
                sources: list_price,
            },
        ))
        .with_field(FieldSpec::new(
            "sold_price",
            amount(2),
            derived(scaled("listed_price", 0.85, 1.0)),
        ))
        .with_field(FieldSpec::new(
            "appraised_value",
            amount(2),
            derived(scaled("listed_price", 0.90, 1.10)),
        ))
        .with_field(FieldSpec::new(
            "days_on_market",
            FieldKind::Integer,
            FieldSource::UniformInt { lo: 30, hi: 180 },
        ))
        .with_field(FieldSpec::new(
            "buyer_city",
            FieldKind::Category,
            derived(DerivedRule::Echo {
                field: "city".to_string(),
                probability: 0.7,
                otherwise: WeightedOption::uniform(CITIES),
            }),
        ))
        .with_field(FieldSpec::new(
            "buyer_txn_count",
            FieldKind::Integer,
            FieldSource::Choice {
                options: vec![
                    WeightedOption::new(1_i64, 70.0),
                    WeightedOption::new(2_i64, 20.0),
                    WeightedOption::new(3_i64, 10.0),
                ],
            },
        ))
        .with_anomalies(anomalies))
}

/// School enrollment records.
pub fn school() -> Result<DatasetConfig> {
    const REFERENCE_YEAR: i32 = 2025;

    let anomalies = AnomalyConfig::new(TargetSelection::Tail { count: 20 })
        .with_kind(
            "ghost_enrollment",
            AnomalyKind::new(vec![
                set("avg_quarterly_grade", 0.0),
                set("final_grade", 0.0),
                set("days_present", 0_i64),
                set("attendance_rate", 0.0),
                set("has_guardian", false),
            ])
            .with_description("enrolled student with no grades, attendance or guardian"),
        )?
        .with_kind(
            "duplicate_identity",
            AnomalyKind::new(vec![Mutation::CopyFrom {
                fields: vec!["full_name".to_string(), "birthdate".to_string()],
                start: 0,
                end: 150,
            }])
            .with_description("name and birth date copied from an earlier student"),
        )?
        .with_kind(
            "grade_manipulation",
            AnomalyKind::new(vec![
                resample(
                    "avg_quarterly_grade",
                    FieldSource::UniformFloat { lo: 50.0, hi: 65.0 },
                ),
                resample("final_grade", FieldSource::UniformFloat { lo: 88.0, hi: 99.0 }),
            ])
            .with_description("failing average with a near-perfect final grade"),
        )?
        .with_kind(
            "attendance_fraud",
            AnomalyKind::new(vec![
                set("days_present", 200_i64),
                set("attendance_rate", 100.0),
                set("avg_quarterly_grade", 0.0),
                set("final_grade", 0.0),
            ])
            .with_description("perfect attendance with no grades"),
        )?
        .with_kind(
            "financial_anomaly",
            AnomalyKind::new(vec![set("amount_paid", 0.0), set("has_scholarship", false)])
                .with_description("nothing paid and no scholarship"),
        )?
        .with_kind(
            "age_anomaly",
            AnomalyKind::new(vec![
                resample(
                    "age",
                    FieldSource::Choice {
                        options: WeightedOption::uniform([5_i64, 6, 25, 30, 35]),
                    },
                ),
                rederive(
                    "birthdate",
                    DerivedRule::BirthDate {
                        age_field: "age".to_string(),
                        reference_year: REFERENCE_YEAR,
                        month: Some(6),
                        day: Some(15),
                    },
                ),
            ])
            .with_description("age impossible for the grade level"),
        )?;

    Ok(DatasetConfig::new("school")
        .with_records(200)
        .with_seed(42)
        .with_field(FieldSpec::new(
            "student_id",
            FieldKind::Identifier,
            sequence("STU-", 4),
        ))
        .with_field(FieldSpec::new(
            "full_name",
            FieldKind::Category,
            uniform_choice(full_names(&FIRST_NAMES, &LAST_NAMES)),
        ))
        .with_field(FieldSpec::new(
            "grade_level",
            FieldKind::Integer,
            uniform_choice(7_i64..=12),
        ))
        .with_field(FieldSpec::new(
            "section",
            FieldKind::Category,
            uniform_choice(["A", "B", "C", "D"]),
        ))
        .with_field(FieldSpec::new(
            "age",
            FieldKind::Integer,
            derived(DerivedRule::Offset {
                base: "grade_level".to_string(),
                lo: 5.0,
                hi: 5.0,
                clamp: None,
            }),
        ))
        .with_field(FieldSpec::new(
            "birthdate",
            FieldKind::Date,
            derived(DerivedRule::BirthDate {
                age_field: "age".to_string(),
                reference_year: REFERENCE_YEAR,
                month: None,
                day: None,
            }),
        ))
        .with_field(FieldSpec::new(
            "avg_quarterly_grade",
            amount(1),
            FieldSource::UniformFloat { lo: 65.0, hi: 95.0 },
        ))
        .with_field(FieldSpec::new(
            "final_grade",
            amount(1),
            derived(DerivedRule::Offset {
                base: "avg_quarterly_grade".to_string(),
                lo: -5.0,
                hi: 5.0,
                clamp: Some(Interval::new(60.0, 100.0)),
            }),
        ))
        .with_field(FieldSpec::new(
            "days_present",
            FieldKind::Integer,
            FieldSource::UniformInt { lo: 150, hi: 196 },
        ))
        .with_field(FieldSpec::new(
            "total_days",
            FieldKind::Integer,
            FieldSource::Constant {
                value: Value::Integer(200),
            },
        ))
        .with_field(FieldSpec::new(
            "attendance_rate",
            amount(1),
            derived(DerivedRule::Ratio {
                numerator: "days_present".to_string(),
                denominator: "total_days".to_string(),
                scale: 100.0,
            }),
        ))
        .with_field(FieldSpec::new(
            "tuition_fee",
            amount(2),
            FieldSource::UniformFloat {
                lo: 15_000.0,
                hi: 50_000.0,
            },
        ))
        .with_field(FieldSpec::new(
            "amount_paid",
            amount(2),
            derived(scaled("tuition_fee", 0.7, 1.0)),
        ))
        .with_field(FieldSpec::new(
            "has_scholarship",
            FieldKind::Flag,
            FieldSource::Bernoulli { probability: 0.15 },
        ))
        .with_field(FieldSpec::new(
            "has_guardian",
            FieldKind::Flag,
            FieldSource::Constant {
                value: Value::Flag(true),
            },
        ))
        .with_bound(BoundRule::Difference {
            minuend: "final_grade".to_string(),
            subtrahend: "avg_quarterly_grade".to_string(),
            lo: -5.0,
            hi: 5.0,
            tolerance: 0.05,
        })
        .with_bound(BoundRule::Unique {
            fields: vec!["full_name".to_string(), "birthdate".to_string()],
        })
        .with_anomalies(anomalies))
}

/// E-commerce orders.
pub fn ecommerce() -> Result<DatasetConfig> {
    let products: [(&str, i64, &str); 8] = [
        ("Classic T-Shirt", 450, "Apparel"),
        ("Hoodie Premium", 1200, "Apparel"),
        ("Phone Case", 350, "Accessories"),
        ("Laptop Sleeve", 800, "Accessories"),
        ("Canvas Tote Bag", 550, "Bags"),
        ("Sticker Pack (10)", 150, "Stationery"),
        ("Coffee Mug", 400, "Home"),
        ("Water Bottle", 600, "Home"),
    ];
    let by_product = |value: fn(&(&str, i64, &str)) -> Value| {
        products
            .iter()
            .map(|p| (p.0.to_string(), FieldSource::Constant { value: value(p) }))
            .collect::<BTreeMap<_, _>>()
    };

    let subtotal = DerivedRule::Product {
        factors: vec!["unit_price".to_string(), "quantity".to_string()],
    };
    let discount_amount = DerivedRule::Percent {
        base: "subtotal".to_string(),
        rate: "discount_pct".to_string(),
    };
    let total = DerivedRule::Difference {
        minuend: "subtotal".to_string(),
        subtrahend: "discount_amount".to_string(),
    };

    let anomalies = AnomalyConfig::new(TargetSelection::Random { count: 42 })
        .with_assignment(KindAssignment::Quotas {
            counts: BTreeMap::from([
                ("revenue_spike".to_string(), 5),
                ("extreme_discount".to_string(), 8),
                ("refund_spike".to_string(), 12),
                ("late_night".to_string(), 10),
                ("duplicate_email".to_string(), 7),
            ]),
        })
        .with_kind(
            "revenue_spike",
            AnomalyKind::new(vec![
                resample("quantity", FieldSource::UniformInt { lo: 50, hi: 200 }),
                set("discount_pct", 0_i64),
                rederive("subtotal", subtotal.clone()),
                rederive("discount_amount", discount_amount.clone()),
                rederive("total", total.clone()),
            ])
            .with_description("bulk order far above normal quantities"),
        )?
        .with_kind(
            "extreme_discount",
            AnomalyKind::new(vec![
                resample(
                    "discount_pct",
                    FieldSource::Choice {
                        options: WeightedOption::uniform([80_i64, 85, 90, 95]),
                    },
                ),
                rederive("discount_amount", discount_amount.clone()),
                rederive("total", total.clone()),
            ])
            .with_description("coupon abuse"),
        )?
        .with_kind(
            "refund_spike",
            AnomalyKind::new(vec![
                set("is_refunded", true),
                set("status", "Refunded"),
                set("order_date", date(2025, 8, 8)?),
            ])
            .with_description("burst of refunds on a single day"),
        )?
        .with_kind(
            "late_night",
            AnomalyKind::new(vec![resample(
                "order_hour",
                FieldSource::UniformInt { lo: 1, hi: 4 },
            )])
            .with_description("order placed between 1 and 4 am"),
        )?
        .with_kind(
            "duplicate_email",
            AnomalyKind::new(vec![
                set("customer_email", "suspicious.buyer@fakeemail.com"),
                set("customer_name", "Juan Suspicious"),
            ])
            .with_description("one customer identity reused across orders"),
        )?;

    Ok(DatasetConfig::new("ecommerce")
        .with_records(500)
        .with_seed(42)
        .with_field(FieldSpec::new(
            "order_id",
            FieldKind::Identifier,
            sequence("SHOP-", 5),
        ))
        .with_field(FieldSpec::new(
            "customer_name",
            FieldKind::Category,
            uniform_choice(full_names(&FIRST_NAMES, &LAST_NAMES)),
        ))
        .with_field(FieldSpec::new(
            "product",
            FieldKind::Category,
            uniform_choice(products.iter().map(|p| p.0)),
        ))
        .with_field(FieldSpec::new(
            "category",
            FieldKind::Category,
            FieldSource::ByCategory {
                field: "product".to_string(),
                sources: by_product(|p| Value::Text(p.2.to_string())),
            },
        ))
        .with_field(FieldSpec::new(
            "unit_price",
            FieldKind::Integer,
            FieldSource::ByCategory {
                field: "product".to_string(),
                sources: by_product(|p| Value::Integer(p.1)),
            },
        ))
        .with_field(FieldSpec::new(
            "quantity",
            FieldKind::Integer,
            FieldSource::UniformInt { lo: 1, hi: 5 },
        ))
        .with_field(FieldSpec::new(
            "discount_pct",
            FieldKind::Integer,
            FieldSource::Choice {
                options: vec![
                    WeightedOption::new(0_i64, 4.0),
                    WeightedOption::new(5_i64, 1.0),
                    WeightedOption::new(10_i64, 1.0),
                    WeightedOption::new(15_i64, 1.0),
                ],
            },
        ))
        .with_field(FieldSpec::new("subtotal", amount(2), derived(subtotal)))
        .with_field(FieldSpec::new(
            "discount_amount",
            amount(2),
            derived(discount_amount),
        ))
        .with_field(FieldSpec::new("total", amount(2), derived(total)))
        .with_field(FieldSpec::new(
            "order_date",
            FieldKind::Date,
            FieldSource::DateRange {
                start: date(2025, 1, 1)?,
                end: date(2025, 12, 31)?,
            },
        ))
        .with_field(FieldSpec::new(
            "order_hour",
            FieldKind::Integer,
            FieldSource::UniformInt { lo: 8, hi: 22 },
        ))
        .with_field(FieldSpec::new(
            "payment_method",
            FieldKind::Category,
            uniform_choice(["Credit Card", "GCash", "PayPal", "COD"]),
        ))
        .with_field(FieldSpec::new(
            "status",
            FieldKind::Category,
            FieldSource::Choice {
                options: vec![
                    WeightedOption::new("Completed", 3.0),
                    WeightedOption::new("Pending", 1.0),
                    WeightedOption::new("Shipped", 1.0),
                ],
            },
        ))
        .with_field(FieldSpec::new(
            "shipping_city",
            FieldKind::Category,
            uniform_choice(CITIES),
        ))
        .with_field(FieldSpec::new(
            "is_refunded",
            FieldKind::Flag,
            FieldSource::Constant {
                value: Value::Flag(false),
            },
        ))
        .with_field(FieldSpec::new(
            "customer_email",
            FieldKind::Category,
            derived(DerivedRule::Template {
                pattern: "{order_id}@customers.example".to_string(),
            }),
        ))
        .with_anomalies(anomalies))
}

/// Student grade sheet exported with blanks, inconsistent sections and
/// repeated rows.
pub fn student_grades() -> Result<DatasetConfig> {
    const FIRST: [&str; 20] = [
        "John", "Jane", "Michael", "Emily", "David", "Sarah", "Chris", "Jessica", "Daniel",
        "Ashley", "James", "Mary", "Robert", "Patricia", "William", "Jennifer", "Joseph", "Linda",
        "Charles", "Elizabeth",
    ];
    const LAST: [&str; 20] = [
        "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis",
        "Rodriguez", "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas",
        "Taylor", "Moore", "Jackson", "Martin",
    ];
    const SUBJECTS: [&str; 4] = ["calculus", "physics", "programming", "ethics"];

    let anomalies = AnomalyConfig::new(TargetSelection::Random { count: 25 })
        .with_assignment(KindAssignment::Quotas {
            counts: BTreeMap::from([
                ("missing_grade".to_string(), 6),
                ("incomplete_record".to_string(), 4),
                ("section_case".to_string(), 10),
                ("grade_outlier".to_string(), 5),
            ]),
        })
        .with_kind(
            "missing_grade",
            AnomalyKind::new(vec![clear("programming")]).with_description("blank grade"),
        )?
        .with_kind(
            "incomplete_record",
            AnomalyKind::new(vec![clear("physics"), clear("ethics")])
                .with_description("several grades never encoded"),
        )?
        .with_kind(
            "section_case",
            AnomalyKind::new(vec![recase("section", LetterCase::Lower)])
                .with_description("section typed in lowercase"),
        )?
        .with_kind(
            "grade_outlier",
            AnomalyKind::new(vec![resample(
                "calculus",
                uniform_choice([150_i64, -10, 500, 105, -5]),
            )])
            .with_description("grade outside 0 to 100"),
        )?
        .with_duplicate_tail(5);

    let grade = FieldSource::ClippedNormal {
        mean: 85.0,
        std_dev: 10.0,
        lo: 40.0,
        hi: 100.0,
    };
    let config = DatasetConfig::new("student-grades")
        .with_records(200)
        .with_seed(42)
        .with_field(FieldSpec::new(
            "student_id",
            FieldKind::Identifier,
            FieldSource::Sequence {
                prefix: "2023-".to_string(),
                width: 4,
                start: 1,
            },
        ))
        .with_field(FieldSpec::new(
            "name",
            FieldKind::Category,
            uniform_choice(full_names(&FIRST, &LAST)),
        ))
        .with_field(FieldSpec::new(
            "section",
            FieldKind::Category,
            uniform_choice(["A", "B", "C", "D"]),
        ));
    Ok(SUBJECTS
        .iter()
        .fold(config, |config, subject| {
            config.with_field(FieldSpec::new(*subject, FieldKind::Integer, grade.clone()))
        })
        .with_anomalies(anomalies))
}

/// Point-of-sale export before cleaning.
pub fn raw_sales() -> Result<DatasetConfig> {
    let anomalies = AnomalyConfig::new(TargetSelection::Random { count: 120 })
        .with_kind(
            "lowercase_product",
            AnomalyKind::new(vec![recase("product", LetterCase::Lower)])
                .with_weight(3.0)
                .with_description("product name in lowercase"),
        )?
        .with_kind(
            "uppercase_product",
            AnomalyKind::new(vec![recase("product", LetterCase::Upper)])
                .with_description("product name in uppercase"),
        )?
        .with_kind(
            "lowercase_customer",
            AnomalyKind::new(vec![recase("customer_name", LetterCase::Lower)])
                .with_description("customer name in lowercase"),
        )?
        .with_kind(
            "missing_customer",
            AnomalyKind::new(vec![clear("customer_name")]).with_description("blank customer"),
        )?
        .with_kind(
            "lowercase_city",
            AnomalyKind::new(vec![recase("customer_city", LetterCase::Lower)])
                .with_weight(2.0)
                .with_description("city in lowercase"),
        )?
        .with_kind(
            "missing_city",
            AnomalyKind::new(vec![clear("customer_city")]).with_description("blank city"),
        )?
        .with_kind(
            "lowercase_region",
            AnomalyKind::new(vec![recase("region", LetterCase::Lower)])
                .with_description("region in lowercase"),
        )?
        .with_kind(
            "missing_region",
            AnomalyKind::new(vec![clear("region")]).with_description("blank region"),
        )?
        .with_kind(
            "negative_price",
            AnomalyKind::new(vec![set("unit_price", -50.0)])
                .with_description("price keyed in as a negative number"),
        )?;

    Ok(DatasetConfig::new("raw-sales")
        .with_records(500)
        .with_seed(42)
        .with_field(FieldSpec::new(
            "transaction_id",
            FieldKind::Identifier,
            sequence("SALE-", 5),
        ))
        .with_field(FieldSpec::new(
            "product",
            FieldKind::Category,
            uniform_choice(["Laptop", "Phone", "Tablet", "Headphones"]),
        ))
        .with_field(FieldSpec::new(
            "customer_name",
            FieldKind::Category,
            uniform_choice([
                "Alice Santos",
                "Bob Cruz",
                "Charlie Reyes",
                "Diana Lopez",
                "Eve Garcia",
                "Frank Torres",
            ]),
        ))
        .with_field(FieldSpec::new(
            "customer_city",
            FieldKind::Category,
            uniform_choice(["Manila", "Cebu", "Davao"]),
        ))
        .with_field(FieldSpec::new(
            "quantity",
            FieldKind::Integer,
            FieldSource::UniformInt { lo: 1, hi: 9 },
        ))
        .with_field(FieldSpec::new(
            "unit_price",
            amount(2),
            uniform_choice([999.99, 499.99, 299.99, 79.99]),
        ))
        .with_field(FieldSpec::new(
            "sale_date",
            FieldKind::Date,
            FieldSource::DateRange {
                start: date(2025, 1, 1)?,
                end: date(2025, 12, 31)?,
            },
        ))
        .with_field(FieldSpec::new(
            "region",
            FieldKind::Category,
            uniform_choice(["Luzon", "Visayas", "Mindanao"]),
        ))
        .with_anomalies(anomalies))
}
