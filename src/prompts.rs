pub const CONVERT_USER: &str = include_str!("../data/prompts/convert_user.txt");
pub const DEMO_OUTPUT: &str = include_str!("../data/prompts/demo_output.tex");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// The instruction prompt sent alongside the image. Blank user instructions
/// leave the slot empty.
pub fn conversion_prompt(instructions: &str) -> String {
    let instructions = instructions.trim();
    let slot = if instructions.is_empty() {
        String::new()
    } else {
        format!("\n\nAdditional instructions from the user:\n{}", instructions)
    };

    render(CONVERT_USER, &[("instructions", slot.as_str())]).trim_end().to_string()
}
