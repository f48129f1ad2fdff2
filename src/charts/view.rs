//! Chart generation and rendering for the charts page.
//!
//! Two ECharts visualisations are generated as JSON configuration for the
//! ECharts library and rendered with corresponding HTML containers and
//! JavaScript initialization code:
//! - **Expenses by Category**: pie chart of expense totals per category
//! - **Income vs Expenses**: monthly income and expense totals

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    datatype::DataPointItem,
    element::{AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger},
    series::{Bar, Pie},
};
use maud::{Markup, PreEscaped, html};

use crate::{html::HeadElement, transaction::Transaction};

use super::aggregation::{category_totals, format_month_label, monthly_totals};

/// A chart with its HTML container ID and ECharts configuration.
pub(super) struct PageChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for the page's charts.
pub(super) fn charts_view(charts: &[PageChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for the page's charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing.
pub(super) fn charts_script(charts: &[PageChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

pub(super) fn category_chart(transactions: &[Transaction]) -> Chart {
    let data: Vec<DataPointItem> = category_totals(transactions)
        .into_iter()
        .map(|category_total| {
            DataPointItem::new(category_total.total).name(category_total.name)
        })
        .collect();

    Chart::new()
        .title(Title::new().text("Expenses by Category"))
        .tooltip(Tooltip::new().trigger(Trigger::Item))
        .legend(Legend::new().top("bottom"))
        .series(Pie::new().name("Expenses").radius("60%").data(data))
}

pub(super) fn income_expense_chart(transactions: &[Transaction]) -> Chart {
    let totals = monthly_totals(transactions);
    let labels: Vec<String> = totals
        .iter()
        .map(|monthly_total| format_month_label(monthly_total.month))
        .collect();
    let income: Vec<f64> = totals.iter().map(|monthly_total| monthly_total.income).collect();
    let expenses: Vec<f64> = totals
        .iter()
        .map(|monthly_total| monthly_total.expense)
        .collect();

    Chart::new()
        .title(Title::new().text("Income vs Expenses").subtext("By month"))
        .tooltip(currency_tooltip())
        .legend(Legend::new().left(250).top("1%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Bar::new().name("Income").data(income))
        .series(Bar::new().name("Expenses").data(expenses))
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('pt-BR', {
              style: 'currency',
              currency: 'BRL'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

#[cfg(test)]
mod chart_tests {
    use time::macros::date;

    use crate::transaction::{Transaction, TransactionKind};

    use super::{category_chart, income_expense_chart};

    fn test_transactions() -> Vec<Transaction> {
        vec![
            Transaction {
                id: 1,
                description: "Salário Mensal".to_string(),
                amount: 4500.0,
                category: "Salário".to_string(),
                date: date!(2023 - 10 - 05),
                kind: TransactionKind::Income,
                ai_generated: false,
            },
            Transaction {
                id: 2,
                description: "Supermercado Mensal".to_string(),
                amount: 850.5,
                category: "Alimentação".to_string(),
                date: date!(2023 - 10 - 15),
                kind: TransactionKind::Expense,
                ai_generated: false,
            },
        ]
    }

    #[test]
    fn category_chart_options_contain_expense_categories() {
        let options = category_chart(&test_transactions()).to_string();

        assert!(options.contains("Alimentação"));
        assert!(
            !options.contains("Salário\""),
            "income categories should not appear in the expense pie"
        );
    }

    #[test]
    fn income_expense_chart_options_contain_month_labels() {
        let options = income_expense_chart(&test_transactions()).to_string();

        assert!(options.contains("Oct"));
        assert!(options.contains("Income"));
        assert!(options.contains("Expenses"));
    }
}
