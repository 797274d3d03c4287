//! Compact text tables of query results, one layout per insight family.
//!
//! Results that do not have the expected shape are passed through as JSON.

use serde_json::Value;

use crate::insights::InsightKind;

pub fn format_results(kind: InsightKind, results: &Value) -> String {
    let table = match kind {
        InsightKind::Trends => format_trends(results),
        InsightKind::Funnel => format_funnel(results),
        InsightKind::Retention => format_retention(results),
    };
    table.unwrap_or_else(|| results.to_string())
}

/// Integers without a fraction, everything else rounded to two decimals.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        let rounded = format!("{:.2}", n);
        rounded.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

pub fn format_percentage(ratio: f64) -> String {
    format!("{}%", format_number(ratio * 100.0))
}

/// `[{"label", "days": [..], "data": [..]}]` → `Date|label...` rows.
fn format_trends(results: &Value) -> Option<String> {
    let series = results.as_array().filter(|s| !s.is_empty())?;
    let labels: Vec<&str> = series
        .iter()
        .map(|s| s.get("label").and_then(Value::as_str))
        .collect::<Option<_>>()?;
    let days: Vec<&str> = series[0]
        .get("days")?
        .as_array()?
        .iter()
        .map(Value::as_str)
        .collect::<Option<_>>()?;
    let data: Vec<Vec<f64>> = series
        .iter()
        .map(|s| {
            s.get("data")?
                .as_array()?
                .iter()
                .map(Value::as_f64)
                .collect::<Option<Vec<_>>>()
        })
        .collect::<Option<_>>()?;

    let mut lines = vec![format!("Date|{}", labels.join("|"))];
    for (i, day) in days.iter().enumerate() {
        let values: Vec<String> = data
            .iter()
            .map(|d| d.get(i).map(|v| format_number(*v)).unwrap_or_default())
            .collect();
        lines.push(format!("{}|{}", day, values.join("|")));
    }
    Some(lines.join("\n"))
}

/// `[{"name", "count"}]` per step → count, conversion and dropoff rows.
fn format_funnel(results: &Value) -> Option<String> {
    let steps = results.as_array().filter(|s| !s.is_empty())?;
    let mut names = Vec::with_capacity(steps.len());
    let mut counts = Vec::with_capacity(steps.len());
    for step in steps {
        names.push(step.get("name")?.as_str()?.to_string());
        counts.push(step.get("count")?.as_f64()?);
    }
    let first = counts[0];
    let conversion: Vec<String> = counts
        .iter()
        .map(|c| if first > 0.0 { format_percentage(c / first) } else { "0%".into() })
        .collect();
    let dropoff: Vec<String> = counts
        .iter()
        .enumerate()
        .map(|(i, c)| match i.checked_sub(1).map(|p| counts[p]) {
            Some(prev) if prev > 0.0 => format_percentage(1.0 - c / prev),
            _ => "0%".into(),
        })
        .collect();
    let count_row: Vec<String> = counts.iter().map(|c| format_number(*c)).collect();
    Some(
        [
            format!("Metric|{}", names.join("|")),
            format!("Total person count|{}", count_row.join("|")),
            format!("Conversion rate|{}", conversion.join("|")),
            format!("Dropoff rate|{}", dropoff.join("|")),
        ]
        .join("\n"),
    )
}

/// `[{"date", "values": [{"count"}..]}]` cohorts → size and retained percentages.
fn format_retention(results: &Value) -> Option<String> {
    let cohorts = results.as_array().filter(|c| !c.is_empty())?;
    let mut rows = Vec::with_capacity(cohorts.len());
    let mut width = 0;
    for cohort in cohorts {
        let date = cohort.get("date")?.as_str()?;
        let counts: Vec<f64> = cohort
            .get("values")?
            .as_array()?
            .iter()
            .map(|v| v.get("count").and_then(Value::as_f64))
            .collect::<Option<_>>()?;
        let size = counts.first().copied().unwrap_or(0.0);
        width = width.max(counts.len());
        let percentages: Vec<String> = counts
            .iter()
            .map(|c| if size > 0.0 { format_percentage(c / size) } else { "0%".into() })
            .collect();
        rows.push(format!("{}|{}|{}", date, format_number(size), percentages.join("|")));
    }
    let periods: Vec<String> = (0..width).map(|i| format!("Period {}", i)).collect();
    let mut lines = vec![format!("Date|Number of persons on date|{}", periods.join("|"))];
    lines.extend(rows);
    Some(lines.join("\n"))
}
