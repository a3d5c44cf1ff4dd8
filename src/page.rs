// 🖥️ Page shell: title, description, year control, chart placeholder

const TEMPLATE: &str = include_str!("../web/index.html");

pub const SOURCE_URL: &str = "https://opendata.cbs.nl/statline/";
pub const SOURCE_CODE_URL: &str = "https://github.com/mvs12/cbs-energyrates-streamlit";

/// Render the dashboard page with one pre-selected option per offered year
pub fn render_page(dataset: &str, year_options: &[i32]) -> String {
    let options: String = year_options
        .iter()
        .map(|year| format!("                <option value=\"{year}\" selected>{year}</option>\n"))
        .collect();

    let first = year_options.iter().min().map(i32::to_string).unwrap_or_default();
    let last = year_options.iter().max().map(i32::to_string).unwrap_or_default();

    TEMPLATE
        .replace("{{YEAR_OPTIONS}}", options.trim_end())
        .replace("{{OPTION_COUNT}}", &year_options.len().to_string())
        .replace("{{FIRST_YEAR}}", &first)
        .replace("{{LAST_YEAR}}", &last)
        .replace("{{SOURCE_URL}}", SOURCE_URL)
        .replace("{{SOURCE_CODE_URL}}", SOURCE_CODE_URL)
        .replace("{{DATASET}}", &escape_html(dataset))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
