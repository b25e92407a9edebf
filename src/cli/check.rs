use crate::preconditions::{self, PreconditionResult, SystemEnvironment};

/// Print the requirement report. Exit code 2 when anything is missing.
pub fn check(python: &str, json: bool) -> i32 {
    let result = preconditions::check(&SystemEnvironment::new(python));
    let platform = os_info::get().to_string();

    if json {
        let report = serde_json::json!({
            "platform": platform,
            "interpreter": python,
            "satisfied": result.is_satisfied(),
            "checks": &result.checks,
        });
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Failed to encode report: {e}");
                return 1;
            }
        }
    } else {
        print!("{}", render(&platform, &result));
    }

    if result.is_satisfied() {
        0
    } else {
        2
    }
}

fn render(platform: &str, result: &PreconditionResult) -> String {
    let mut text = format!("Platform: {platform}\n");
    for check in &result.checks {
        let mark = if check.satisfied { "ok" } else { "missing" };
        text.push_str(&format!(
            "  [{mark:^7}] {}: {}\n",
            check.requirement, check.detail
        ));
        if !check.satisfied {
            text.push_str(&format!("            {}\n", check.requirement.remedy()));
        }
    }
    text
}
