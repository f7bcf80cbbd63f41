//! Prompt construction for the content generator
//!
//! The template is plain text with `{placeholder}` slots. Unknown placeholders
//! are left untouched so a typo shows up in the generated prompt rather than
//! silently disappearing.

use crate::generator::GenerationRequest;
use chrono::Utc;

pub const DEFAULT_PROMPT_TEMPLATE: &str = "Create a professional {platform} post for {company}, \
a company that provides {product}. The company vision is: \"{vision}\".

The post should focus on the theme: {theme}
Content style: {content_type}

Requirements:
- Be concise and substantive (max {max_chars} characters)
- Include 1-2 relevant hashtags
- {emoji_instruction}
- Emphasize data-driven decision making and financial clarity
- Avoid hype language and focus on factual, substantive content

Today is {date}.

Format: Just provide the post text, nothing else.";

/// Company details substituted into every prompt.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub template: String,
    pub company: String,
    pub product: String,
    pub vision: String,
}

impl PromptTemplate {
    pub fn render(&self, request: &GenerationRequest) -> String {
        let emoji_instruction = if request.include_emojis {
            "Include 1-2 relevant emojis in the post."
        } else {
            "Do not use emojis in the post."
        };

        let content_type = request
            .content_type
            .as_deref()
            .map(|t| t.replace('_', " "))
            .unwrap_or_else(|| "general update".to_string());

        self.template
            .replace("{company}", &self.company)
            .replace("{product}", &self.product)
            .replace("{vision}", &self.vision)
            .replace("{theme}", &request.theme)
            .replace("{content_type}", &content_type)
            .replace("{platform}", request.platform.as_str())
            .replace("{max_chars}", &request.platform.max_chars().to_string())
            .replace("{emoji_instruction}", emoji_instruction)
            .replace("{date}", &get_date_context())
    }
}

/// Current date with weekday, e.g. `Friday, October 16, 2026`.
pub fn get_date_context() -> String {
    Utc::now().format("%A, %B %d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::Platform;

    fn template(body: &str) -> PromptTemplate {
        PromptTemplate {
            template: body.to_string(),
            company: "Treasure.Corp".to_string(),
            product: "treasury dashboards".to_string(),
            vision: "Clarity".to_string(),
        }
    }

    #[test]
    fn test_render_default_template() {
        let request = GenerationRequest::new("Treasury Education", Platform::Twitter);
        let prompt = template(DEFAULT_PROMPT_TEMPLATE).render(&request);

        assert!(prompt.contains("Treasure.Corp"));
        assert!(prompt.contains("theme: Treasury Education"));
        assert!(prompt.contains("max 280 characters"));
        assert!(prompt.contains("Include 1-2 relevant emojis"));
        assert!(!prompt.contains("{date}"));
    }

    #[test]
    fn test_render_without_emojis() {
        let mut request = GenerationRequest::new("Polls", Platform::LinkedIn);
        request.include_emojis = false;
        let prompt = template("{platform}|{max_chars}|{emoji_instruction}|{unknown}").render(&request);
        assert_eq!(
            prompt,
            "linkedin|3000|Do not use emojis in the post.|{unknown}"
        );
    }

    #[test]
    fn test_render_content_type() {
        let request = GenerationRequest::new("Governance Engagement", Platform::Twitter)
            .with_content_type(Some("breaking_news".to_string()));
        let prompt = template(DEFAULT_PROMPT_TEMPLATE).render(&request);
        assert!(prompt.contains("Content style: breaking news"));

        let plain = GenerationRequest::new("Governance Engagement", Platform::Twitter);
        assert_eq!(
            template("{content_type}").render(&plain),
            "general update"
        );
    }

    #[test]
    fn test_date_context_format() {
        let context = get_date_context();
        assert!(context.contains(", "));
        assert!(context.chars().any(|c| c.is_ascii_digit()));
    }
}
