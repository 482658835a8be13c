use crate::error::{WorkbenchError, WorkbenchResult};
use crate::models::{CompanyContext, PromptStage, SessionState};

/// Placeholder rendered for an empty company context field
pub const NOT_SPECIFIED: &str = "Not specified";

/// Maximum number of characters of enhanced text embedded in the
/// responsibilities prompt
pub const RESPONSIBILITIES_INPUT_LIMIT: usize = 4000;

pub const ENHANCE_SYSTEM_MESSAGE: &str = "You are a world-class job description enhancement specialist with deep expertise in HR, recruiting, and talent acquisition. Your job is to transform basic job descriptions into comprehensive, precise, and compelling documents focused on the job content itself. DO NOT include company information sections. Focus on enhancing and structuring the actual job requirements, responsibilities, and qualifications. For industry classification, use ONLY actual business sector industries (not job functions) from standard categories. Return only formatted text paragraphs, not JSON. For skills, use format 'Skill Name (Proficiency Level)' not JSON objects.";

pub const BASE_INFO_SYSTEM_MESSAGE: &str =
    "You are a base info extraction expert. Return ONLY a valid JSON object.";

pub const SKILLS_SYSTEM_MESSAGE: &str = "You are a skill extraction expert. ALWAYS prioritize the job role over company context. Extract skills appropriate for the specific role, not the company's main business. Return ONLY a JSON array.";

pub const RESPONSIBILITIES_SYSTEM_MESSAGE: &str =
    "You are a responsibility extraction expert. Return ONLY a JSON array.";

/// Fixed system message sent alongside each prompt
pub fn system_message(stage: PromptStage) -> &'static str {
    match stage {
        PromptStage::Enhance => ENHANCE_SYSTEM_MESSAGE,
        PromptStage::BaseInfo => BASE_INFO_SYSTEM_MESSAGE,
        PromptStage::Skills => SKILLS_SYSTEM_MESSAGE,
        PromptStage::Responsibilities => RESPONSIBILITIES_SYSTEM_MESSAGE,
    }
}

/// Values substituted into a prompt template
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub company: &'a CompanyContext,
    /// Raw job description for enhancement, enhanced text for extraction
    pub input_text: &'a str,
}

impl<'a> PromptContext<'a> {
    pub fn new(company: &'a CompanyContext, input_text: &'a str) -> Self {
        Self {
            company,
            input_text,
        }
    }
}

/// Build the prompt that will be sent for `stage`.
///
/// A saved override is returned verbatim. Otherwise the stage template is
/// rendered from the session: `raw_text` feeds the enhancement prompt, the
/// stored enhanced text feeds the three extraction prompts.
pub fn build_prompt(
    state: &SessionState,
    stage: PromptStage,
    raw_text: Option<&str>,
) -> WorkbenchResult<String> {
    if let Some(saved) = state.prompt_override(stage) {
        return Ok(saved.to_string());
    }

    let input_text = if stage.needs_enhanced_text() {
        state
            .enhanced_text
            .as_deref()
            .ok_or_else(|| WorkbenchError::validation("Step 1 required"))?
    } else {
        raw_text.unwrap_or_default()
    };

    Ok(render_default_prompt(
        stage,
        &PromptContext::new(&state.company_context, input_text),
    ))
}

/// Render the stage template, ignoring any saved override
pub fn render_default_prompt(stage: PromptStage, ctx: &PromptContext<'_>) -> String {
    match stage {
        PromptStage::Enhance => render_enhance_prompt(ctx),
        PromptStage::BaseInfo => render_base_info_prompt(ctx),
        PromptStage::Skills => render_skills_prompt(ctx),
        PromptStage::Responsibilities => render_responsibilities_prompt(ctx),
    }
}

fn or_not_specified(value: &str) -> &str {
    if value.is_empty() { NOT_SPECIFIED } else { value }
}

/// Company context block embedded in the enhancement prompt
pub fn company_context_block(company: &CompanyContext) -> String {
    COMPANY_CONTEXT_TEMPLATE
        .replace("{name}", or_not_specified(&company.name))
        .replace("{industry}", or_not_specified(&company.industry))
        .replace("{company_size}", or_not_specified(&company.company_size))
        .replace("{headquarters}", or_not_specified(&company.headquarters))
}

/// Inline record form of the company context used by the skills prompt
fn company_info_literal(company: &CompanyContext) -> String {
    // Double quotes only when the value holds a single quote and no double quote
    fn quote(value: &str) -> String {
        let delim = if value.contains('\'') && !value.contains('"') {
            '"'
        } else {
            '\''
        };
        let mut out = String::with_capacity(value.len() + 2);
        out.push(delim);
        for c in value.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c == delim => {
                    out.push('\\');
                    out.push(c);
                }
                c => out.push(c),
            }
        }
        out.push(delim);
        out
    }

    format!(
        "{{'name': {}, 'industry': {}, 'company_size': {}, 'headquarters': {}}}",
        quote(&company.name),
        quote(&company.industry),
        quote(&company.company_size),
        quote(&company.headquarters)
    )
}

/// First `limit` characters of `text`
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

// Operator text is substituted last so placeholder-like sequences inside it
// are never expanded.

fn render_enhance_prompt(ctx: &PromptContext<'_>) -> String {
    ENHANCE_TEMPLATE
        .replace("{company_context}", &company_context_block(ctx.company))
        .replace("{jd_text}", ctx.input_text)
}

fn render_base_info_prompt(ctx: &PromptContext<'_>) -> String {
    BASE_INFO_TEMPLATE.replace("{enhanced_text}", ctx.input_text)
}

fn render_skills_prompt(ctx: &PromptContext<'_>) -> String {
    SKILLS_TEMPLATE
        .replace("{company_info}", &company_info_literal(ctx.company))
        .replace("{enhanced_text}", ctx.input_text)
}

fn render_responsibilities_prompt(ctx: &PromptContext<'_>) -> String {
    RESPONSIBILITIES_TEMPLATE.replace(
        "{enhanced_text}",
        truncate_chars(ctx.input_text, RESPONSIBILITIES_INPUT_LIMIT),
    )
}

const COMPANY_CONTEXT_TEMPLATE: &str = r#"
# MINIMAL COMPANY CONTEXT (FOR ROLE ANALYSIS ONLY):
Company Information Available (for context only - DO NOT include in output):
- Name: {name}
- Industry: {industry}
- Size: {company_size}
- Location: {headquarters}

CONTEXT APPLICATION RULES:
1. USE FOR ROLE ANALYSIS ONLY: Use company context only to understand the role better
2. DO NOT INCLUDE COMPANY INFO: Do not display company information in the enhanced output
3. FOCUS ON JOB CONTENT: Prioritize and enhance the actual job description content
4. ROLE-SPECIFIC ENHANCEMENT: Enhance based on what the role actually requires, not company details
"#;

const ENHANCE_TEMPLATE: &str = r#"You are a professional job description writer and enhancer with expertise in talent acquisition and HR.
Extract and significantly enhance the following job description to create a comprehensive, compelling, and precise document.

Your task is to transform this job description into a well-formatted, enhanced text document that covers all the important fields that would typically be in a structured job description. The output should be in PLAIN TEXT format for display in a simple text box.

{company_context}

# ENHANCEMENT REQUIREMENTS:

## Format the output as readable plain text covering these sections:
1. Job Title and Basic Information - Include job title, job code (if any), department, job level, job function, and seniority level
2. Industry Classification - List the most relevant industries this position belongs to
3. Experience Requirements - Detail the experience range and qualifications needed
4. Job Summary - A comprehensive overview of the position
5. Key Responsibilities - Detailed list of what the person will do
6. Required Qualifications - Education, experience, and mandatory requirements including college/university preferences
7. Preferred Qualifications - Nice-to-have qualifications, postgraduate degrees, and field of study preferences
8. Skills Required - Technical, domain, and soft skills with proficiency levels
9. Languages and Certifications - Required languages and certifications (if any). If no specific language is mentioned, automatically detect the language of the input text and list it as a required language with "Fluent" proficiency
10. Work Environment and Arrangements:
    - Employment type (full-time, part-time, contract)
    - Workplace type (remote, hybrid, onsite)
    - Location information
    - Travel requirements and shift types
11. Compensation and Benefits (if specified):
    - Base salary and salary ranges
    - Benefits package and perks
    - Relocation assistance and visa sponsorship details
12. Interview Process (if specified):
    - Number of interview rounds
    - Reporting structure and team dynamics
13. Key Performance Indicators - Success metrics for the role

# DETAILED ENHANCEMENT INSTRUCTIONS:

## IMPORTANT: FOCUS ON JOB CONTENT ONLY
- DO NOT include company information sections
- Focus entirely on the job description content and requirements
- Enhance and structure the actual job-related information
- Make the output clean, professional, and focused on the role itself

## For ALL fields:
- Transform vague or generic descriptions into specific, detailed, and meaningful content
- Use professional, industry-standard terminology and clear language
- Ensure all content is actionable, measurable, and relevant for candidate evaluation
- For any fields with no information available, mention "Not specified" or skip the section
- Remove redundant language and filler content that doesn't add value
- **CRITICAL: PRESERVE ALL INFORMATION** - Ensure no information from the original job description is lost or omitted. Every detail, requirement, qualification, responsibility, and specification must be included in the enhanced output

## EXCLUSIVE GUIDELINE -
- Use every single field provided as context or input.
- Establish a user-based relationship by leveraging all available context.
- When generating or enhancing the job description, identify and incorporate all context in a logical, coherent flow.
- Ensure the flow of information justifies the creation or enhancement of the job description.
- The enhanced job description must contribute to the relevance and accuracy of future candidate searches.
- Prioritize sub-industry and company context provided by the user for industry tagging. If additional relevant industries are found, add them; if any are missing, note as such.

## JOB TITLE GENERATION (MOST CRITICAL - COMPREHENSIVE ANALYSIS ACROSS ALL PARAMETERS):
- Generate exactly 4-5 OPTIMAL job titles through COMPREHENSIVE PARAMETER ANALYSIS
- Analyze ALL parameters: responsibilities, skills, experience level, company industry, company size, company stage, qualifications, and role scope
- These titles MUST be optimized for LinkedIn matching and cover different ways this role might be advertised across ALL industries
- Base titles on COMPLETE analysis of job content, company context, and market standards

## IMPORTANT OUTPUT FORMAT:
- Return ONLY formatted text paragraphs, NOT JSON
- Use clear section headers with proper formatting
- Make the text readable and professional with good spacing
- Include all relevant information in a structured, easy-to-read format
- Do NOT include any JSON formatting, brackets, or technical syntax
- The output should be human-readable text suitable for display in a text box
- For skills: Use format "Skill Name (Proficiency Level)" - NOT JSON objects
- For all sections: Use bullet points or numbered lists with plain text, not structured data
- **SPACING**: Add extra line breaks between sections for better readability
- **SECTION SEPARATION**: Use clear visual separation between major sections
- **FORMATTING**: Use consistent formatting with proper indentation and spacing

Enhanced Job Description Text:
{jd_text}

Return only the enhanced job description text in a readable, formatted paragraph structure without any JSON formatting. Focus on the job content, requirements, and responsibilities - do not include company information sections."#;

const SKILLS_TEMPLATE: &str = r#"You are a skill extraction expert. ALWAYS prioritize the job role over company context. Extract skills appropriate for the specific role, not the company's main business. Return ONLY a JSON array.

Job Title: [Extract from text]
Industry: [Extract from text]
Experience Level: [Extract from text]
Company Info: {company_info}

CRITICAL ROLE-BASED SKILL SELECTION RULES:
1. **MANDATORY ROLE-FIRST APPROACH**: Extract skills appropriate for THIS SPECIFIC ROLE, NOT the company's main business
2. **FOR UNRELATED ROLES**: Use ONLY standard industry skills for that role, ignore company-specific technologies
3. **ONLY for DIRECTLY RELATED ROLES**: Integrate relevant company-specific technologies
4. **VALIDATION**: If role is NOT related to company's main business, company-specific tech skills should NOT appear
5. **CRITICAL**: Do NOT include advertising, marketing, or tech skills unless the role is directly related to those functions

**EXPLICIT UNRELATED ROLE INSTRUCTIONS - CRITICAL FOR SKILLS GENERATION:**
- **IF THE ROLE IS UNRELATED TO COMPANY'S MAIN BUSINESS**:
  - DO NOT use any company-specific technologies, tools, or platforms mentioned in company context
  - DO NOT use company's industry-specific skills unless they directly apply to the role
  - DO NOT use company's proprietary systems or internal tools
  - DO NOT use company's specific methodologies or frameworks unless they are industry-standard for the role
  - DO NOT use company's business domain knowledge unless it's directly relevant to the role
  - **ONLY use standard, industry-appropriate skills for the specific role type**
  - **IGNORE company context completely for skill selection**

**EXAMPLES OF UNRELATED ROLES:**
- If company is a tech company but hiring an HR Manager → Use HR skills, NOT tech skills
- If company is a healthcare company but hiring an Accountant → Use accounting skills, NOT healthcare skills
- If company is a finance company but hiring a Marketing Specialist → Use marketing skills, NOT finance skills
- If company is a manufacturing company but hiring a Sales Representative → Use sales skills, NOT manufacturing skills

**EXAMPLES OF RELATED ROLES:**
- If company is a tech company hiring a Software Engineer → Use tech skills + company-specific technologies
- If company is a healthcare company hiring a Nurse → Use healthcare skills + company-specific medical systems
- If company is a finance company hiring a Financial Analyst → Use finance skills + company-specific financial tools

DOMAIN-SPECIFIC SKILLS (60-70% of skills):
- Focus on skills that are specific to the role's domain and industry
- Select skills that professionals in this exact role would list on LinkedIn
- Avoid generic skills that don't match the role's specific domain
- Use industry-standard skills for the role's domain

TECHNICAL SKILLS (if relevant, 20-30%):
- Use standard tool/platform names relevant to the role's domain
- Use standard methodologies appropriate for the role's industry
- Use standard technologies that professionals in this role would use

SOFT SKILLS (10-20% maximum):
- Use common LinkedIn terms appropriate for the role's seniority level
- Focus on leadership, communication, and management skills relevant to the role

Format:
   - Return ONLY a JSON array of skill objects
   - Each object: {"skill_name": "skill", "skill_type": "technical/domain/soft", "proficiency_level": "Beginner/Intermediate/Advanced/Expert"}
   - Order by importance: domain skills first, then technical, soft skills last
   - No repetition or compound skills
   - Extract EXACTLY 8-10 skills - no more, no less

Remember: Skills must match what successful professionals in this exact role/industry list on LinkedIn.

Enhanced Job Description Text:
{enhanced_text}"#;

const RESPONSIBILITIES_TEMPLATE: &str = r#"You are a LinkedIn talent sourcing expert. Extract EXACTLY 6 responsibilities that match how real professionals describe their work on LinkedIn.

Job Title: [Extract from text]
Job Description:
{enhanced_text}

CRITICAL RULES FOR LINKEDIN OPTIMIZATION:
1. Think about the ACTUAL day-to-day work:
   - For technical roles: Focus on technical tasks, tools used, and team interactions
   - For business roles: Focus on business impact, client/stakeholder interaction, and deliverables
   - For manual/operational roles: Focus on physical tasks, equipment operated, and procedures followed

2. Format each responsibility:
   - Use 3-6 words, action-oriented
   - Start with strong verbs (e.g., "Lead", "Develop", "Manage", "Implement")
   - Include measurable outcomes where possible
   - Use industry-standard terminology

3. AVOID:
   - Generic responsibilities that could apply to any job
   - Company-specific jargon or acronyms
   - Overly detailed or technical descriptions
   - Responsibilities that don't match the seniority level

4. Structure:
   - Return ONLY a JSON array of 6 strings
   - Order by importance (most critical first)
   - No repetition
   - Each responsibility should be distinct

Example for a Senior Software Engineer:
[
    "Lead backend development team",
    "Architect cloud infrastructure solutions",
    "Implement CI/CD automation pipelines",
    "Mentor junior developers",
    "Design system architecture",
    "Optimize application performance"
]

Example for a Warehouse Operator:
[
    "Operate forklift equipment safely",
    "Manage inventory tracking system",
    "Load/unload delivery trucks",
    "Maintain warehouse organization",
    "Process shipping documentation",
    "Perform equipment maintenance checks"
]

Remember: These responsibilities should match what successful professionals in similar roles list on their LinkedIn profiles."#;

const BASE_INFO_TEMPLATE: &str = r#"Extract ONLY these fields from the job description. Return ONLY JSON.

CRITICAL RULES:
1. Return ONLY a JSON object with these fields: job_title, job_code, job_level, department, job_function, jd_industry, experience_range, job_summary, required_qualifications, seniority_level, location
2. Use null for missing fields
3. PROCESS ORDER: First extract experience range, then use that to determine seniority level
4. For job titles: 4-5 LinkedIn-optimized titles
5. For jd_industry: CRITICAL ROLE-BASED CLASSIFICATION - Use ONLY industry names from standard categories:
   **MANDATORY RULE**: Classify based on the ROLE'S industry, NOT the company's industry
   **VALIDATION**: If role is NOT related to company's main business, the company industry should NOT appear in jd_industry
   **EXAMPLES OF PROPER INDUSTRIES**: "Software Development", "IT Services and IT Consulting", "Financial Services", "Healthcare", "Manufacturing", "Retail", "Education", "Consulting"
   **EXAMPLES OF WHAT NOT TO USE**: "Quality Assurance", "Testing", "Development", "Sales", "Marketing" (these are job functions, not industries)

6. For experience: {min: X, max: Y} - CRITICAL RULES:
   - Extract the EXACT minimum years from the job description
   - If job says "11 years experience" = min: 11, max: 11 (NOT min: 8, max: 11)
   - If job says "8-11 years experience" = min: 8, max: 11
   - If job says "5+ years experience" = min: 5, max: based on seniority level
   - Set MAXIMUM based on seniority level (don't set both min and max to the same value unless job specifies exact years):
     * Internship: max 1 year
     * Entry Level: max 3 years
     * Junior: max 5 years
     * Junior to Mid: max 7 years
     * Mid Level: max 10 years
     * Mid - Senior: max 12 years
     * Senior Level: max 15 years
     * CXO: max 20 years

7. For seniority_level: Use EXACTLY these values: Internship/Entry Level/Junior/Junior to Mid/Mid Level/Mid - Senior/Senior Level/CXO
   - Determine from experience range and job requirements
   - If experience is 0-1 years: Internship
   - If experience is 1-3 years: Entry Level
   - If experience is 3-5 years: Junior
   - If experience is 5-7 years: Junior to Mid
   - If experience is 7-10 years: Mid Level
   - If experience is 10-12 years: Mid - Senior
   - If experience is 12+ years: Senior Level
   - If job title contains C-level terms (CEO, CTO, CFO, etc.): CXO

8. For location: Extract ONLY the physical location, not remote/hybrid status
   - Examples: "San Francisco, CA", "New York, NY", "London, UK"
   - Do NOT include: "Remote", "Hybrid", "On-site" in location field

Enhanced Job Description Text:
{enhanced_text}

Return ONLY a valid JSON object with the specified fields."#;

#[cfg(test)]
mod tests {
    use super::*;

    const RAW_JD: &str = "Senior backend engineer, 5 years Python";

    #[test]
    fn test_enhance_prompt_embeds_input_and_unspecified_context() {
        let state = SessionState::new();
        let prompt = build_prompt(&state, PromptStage::Enhance, Some(RAW_JD)).unwrap();

        assert!(prompt.contains(RAW_JD));
        assert!(prompt.contains("- Name: Not specified"));
        assert!(prompt.contains("- Industry: Not specified"));
        assert!(prompt.contains("- Size: Not specified"));
        assert!(prompt.contains("- Location: Not specified"));
        assert!(!prompt.contains("{jd_text}"));
        assert!(!prompt.contains("{company_context}"));
    }

    #[test]
    fn test_company_context_block_uses_supplied_fields() {
        let company = CompanyContext {
            name: "TechCorp Inc.".to_string(),
            industry: "Software Development".to_string(),
            ..Default::default()
        };
        let block = company_context_block(&company);

        assert!(block.contains("- Name: TechCorp Inc."));
        assert!(block.contains("- Industry: Software Development"));
        assert!(block.contains("- Size: Not specified"));
        assert!(block.contains("- Location: Not specified"));
    }

    #[test]
    fn test_extraction_prompts_require_enhanced_text() {
        let state = SessionState::new();
        for stage in PromptStage::EXTRACTION {
            let err = build_prompt(&state, stage, None).unwrap_err();
            assert_eq!(err, WorkbenchError::validation("Step 1 required"));
        }
    }

    #[test]
    fn test_extraction_prompts_embed_enhanced_text() {
        let mut state = SessionState::new();
        state.enhanced_text = Some("Job Title: Senior Backend Engineer".to_string());
        state.company_context.name = "O'Brien & Co".to_string();

        let base = build_prompt(&state, PromptStage::BaseInfo, None).unwrap();
        assert!(base.contains("Job Title: Senior Backend Engineer"));
        assert!(base.contains("{min: X, max: Y}"));

        let skills = build_prompt(&state, PromptStage::Skills, None).unwrap();
        assert!(skills.contains("Job Title: Senior Backend Engineer"));
        assert!(skills.contains(
            r#"Company Info: {'name': "O'Brien & Co", 'industry': '', 'company_size': '', 'headquarters': ''}"#
        ));
        assert!(skills.contains(r#"{"skill_name": "skill""#));
    }

    #[test]
    fn test_company_info_literal_quoting() {
        let ctx = CompanyContext {
            name: "O'Brien \"Labs\"".to_string(),
            industry: "R&D\tLab".to_string(),
            company_size: "10\\20".to_string(),
            headquarters: "Cork".to_string(),
        };

        assert_eq!(
            company_info_literal(&ctx),
            r#"{'name': 'O\'Brien "Labs"', 'industry': 'R&D\tLab', 'company_size': '10\\20', 'headquarters': 'Cork'}"#
        );
    }

    #[test]
    fn test_responsibilities_prompt_truncates_input() {
        let mut state = SessionState::new();
        let long_text = format!("{}{}", "a".repeat(RESPONSIBILITIES_INPUT_LIMIT), "TAIL");
        state.enhanced_text = Some(long_text);

        let prompt = build_prompt(&state, PromptStage::Responsibilities, None).unwrap();
        assert!(prompt.contains(&"a".repeat(RESPONSIBILITIES_INPUT_LIMIT)));
        assert!(!prompt.contains("TAIL"));
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 4), "");
    }

    #[test]
    fn test_override_returned_verbatim() {
        let mut state = SessionState::new();
        state.enhanced_text = Some("original".to_string());
        state
            .prompt_overrides
            .insert(PromptStage::Skills, "frozen skills prompt".to_string());

        state.enhanced_text = Some("changed later".to_string());
        state.company_context.name = "Other Corp".to_string();

        assert_eq!(
            build_prompt(&state, PromptStage::Skills, None).unwrap(),
            "frozen skills prompt"
        );
        // Other stages still render from the template
        let base = build_prompt(&state, PromptStage::BaseInfo, None).unwrap();
        assert!(base.contains("changed later"));
    }

    #[test]
    fn test_operator_text_is_not_expanded() {
        let state = SessionState::new();
        let prompt = build_prompt(&state, PromptStage::Enhance, Some("see {company_context}")).unwrap();
        assert!(prompt.contains("see {company_context}"));
    }

    #[test]
    fn test_system_messages_per_stage() {
        assert!(system_message(PromptStage::Enhance).contains("enhancement specialist"));
        assert!(system_message(PromptStage::BaseInfo).contains("JSON object"));
        assert!(system_message(PromptStage::Skills).contains("JSON array"));
        assert!(system_message(PromptStage::Responsibilities).contains("responsibility"));
    }
}
