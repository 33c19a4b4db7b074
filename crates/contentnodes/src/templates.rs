//! Predefined content-generation workflows

use contentcore::{NodeType, Value, WorkflowDefinition, WorkflowNode};
use serde::Serialize;
use uuid::Uuid;

/// Catalogue entry for a template
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub estimated_time: String,
    pub node_count: usize,
    pub version: String,
}

impl TemplateSummary {
    fn from_definition(def: &WorkflowDefinition) -> Self {
        let meta = |key: &str, default: &str| {
            def.metadata
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            description: def.description.clone(),
            category: meta("category", "general"),
            difficulty: meta("difficulty", "beginner"),
            estimated_time: meta("estimated_time", "unknown"),
            node_count: def.nodes.len(),
            version: def.version.clone(),
        }
    }
}

fn node(id: &str, node_type: NodeType, name: &str, description: &str) -> WorkflowNode {
    WorkflowNode::new(id, node_type, name).with_description(description)
}

fn input(id: &str, name: &str, description: &str, fields: &[&str]) -> WorkflowNode {
    node(id, NodeType::Input, name, description).with_config("input_fields", fields.to_vec())
}

fn output(id: &str, name: &str, description: &str, fields: &[&str]) -> WorkflowNode {
    node(id, NodeType::Output, name, description).with_config("output_fields", fields.to_vec())
}

fn text(
    id: &str,
    name: &str,
    description: &str,
    prompt: &str,
    max_length: i64,
    temperature: f64,
) -> WorkflowNode {
    node(id, NodeType::TextGeneration, name, description)
        .with_config("prompt", prompt)
        .with_config("max_length", max_length)
        .with_config("temperature", temperature)
}

fn image(id: &str, name: &str, description: &str, style: &str, width: i64, height: i64) -> WorkflowNode {
    node(id, NodeType::ImageGeneration, name, description)
        .with_config("style", style)
        .with_config("width", width)
        .with_config("height", height)
}

fn music(id: &str, name: &str, description: &str, style: &str, duration: i64) -> WorkflowNode {
    node(id, NodeType::MusicGeneration, name, description)
        .with_config("style", style)
        .with_config("duration", duration)
}

fn edges(mut def: WorkflowDefinition, pairs: &[(&str, &str)]) -> WorkflowDefinition {
    for (from, to) in pairs {
        def = def.with_edge(*from, *to);
    }
    def
}

pub fn blog_post() -> WorkflowDefinition {
    let def = WorkflowDefinition::new("blog_post_workflow", "Blog post")
        .with_description("Writes a blog post with a cover image and optimization suggestions")
        .with_metadata("category", "content_creation")
        .with_metadata("difficulty", "beginner")
        .with_metadata("estimated_time", "5-10 minutes")
        .with_node(input(
            "input_topic",
            "Topic",
            "Blog post topic",
            &["topic", "target_audience", "tone"],
        ))
        .with_node(text(
            "generate_outline",
            "Outline",
            "Outline the post from the topic",
            "Write a detailed outline for a blog post about '{topic}' for {target_audience}, in a {tone} tone.",
            300,
            0.7,
        ))
        .with_node(text(
            "generate_content",
            "Draft",
            "Expand the outline into the full post",
            "Write a complete blog post following this outline: {text}",
            2000,
            0.8,
        ))
        .with_node(
            image(
                "generate_image",
                "Cover image",
                "Illustrate the post",
                "professional",
                800,
                600,
            )
            .with_config("prompt", "A cover image for a blog post about '{topic}'"),
        )
        .with_node(
            node(
                "analyze_content",
                NodeType::ContentAnalysis,
                "Analysis",
                "Analyze the draft",
            )
            .with_config("analysis_type", "comprehensive"),
        )
        .with_node(
            node(
                "optimize_content",
                NodeType::ContentOptimization,
                "Optimization",
                "Polish the draft for the blog",
            )
            .with_config("platform", "blog")
            .with_config("optimization_level", "high"),
        )
        .with_node(output(
            "output_result",
            "Result",
            "The finished post",
            &["optimized_content", "image_url", "suggested_tags"],
        ));

    edges(
        def,
        &[
            ("input_topic", "generate_outline"),
            ("generate_outline", "generate_content"),
            ("input_topic", "generate_image"),
            ("generate_content", "analyze_content"),
            ("analyze_content", "optimize_content"),
            ("optimize_content", "output_result"),
            ("generate_image", "output_result"),
        ],
    )
}

pub fn social_media() -> WorkflowDefinition {
    let def = WorkflowDefinition::new("social_media_workflow", "Social media post")
        .with_description("Copy, visual and soundtrack for a social post, then publishes it")
        .with_metadata("category", "social_media")
        .with_metadata("difficulty", "intermediate")
        .with_metadata("estimated_time", "3-8 minutes")
        .with_node(input(
            "input_idea",
            "Idea",
            "The post idea",
            &["idea", "platform", "style"],
        ))
        .with_node(text(
            "generate_copy",
            "Copy",
            "Write the post copy",
            "Write a {style} post for {platform} about '{idea}'.",
            500,
            0.9,
        ))
        .with_node(image(
            "generate_visual",
            "Visual",
            "Square visual for the post",
            "social_media",
            1080,
            1080,
        ))
        .with_node(music(
            "generate_music",
            "Background music",
            "Short background track",
            "upbeat",
            15,
        ))
        .with_node(node(
            "analyze_content",
            NodeType::ContentAnalysis,
            "Analysis",
            "Analyze the copy",
        ))
        .with_node(
            node(
                "optimize_for_platform",
                NodeType::ContentOptimization,
                "Platform optimization",
                "Adapt the copy to the platform",
            )
            .with_config("platform", "{platform}")
            .with_config("optimization_level", "platform_specific"),
        )
        .with_node(
            node(
                "publish_content",
                NodeType::PlatformPublish,
                "Publish",
                "Post to the platform",
            )
            .with_config("platform", "{platform}")
            .with_config("auto_publish", false),
        );

    edges(
        def,
        &[
            ("input_idea", "generate_copy"),
            ("input_idea", "generate_visual"),
            ("input_idea", "generate_music"),
            ("generate_copy", "analyze_content"),
            ("generate_visual", "analyze_content"),
            ("analyze_content", "optimize_for_platform"),
            ("optimize_for_platform", "publish_content"),
            ("generate_music", "publish_content"),
        ],
    )
}

pub fn story_creation() -> WorkflowDefinition {
    let def = WorkflowDefinition::new("story_creation_workflow", "Story creation")
        .with_description("Characters, plot, full story, illustrations and soundtrack")
        .with_metadata("category", "creative_writing")
        .with_metadata("difficulty", "advanced")
        .with_metadata("estimated_time", "10-20 minutes")
        .with_node(input(
            "input_story_concept",
            "Story concept",
            "The premise of the story",
            &["genre", "main_character", "setting", "conflict"],
        ))
        .with_node(text(
            "develop_characters",
            "Characters",
            "Develop the protagonist",
            "Develop the background and personality of {main_character}, the protagonist of a {genre} story.",
            800,
            0.8,
        ))
        .with_node(text(
            "create_plot_outline",
            "Plot outline",
            "Outline the plot",
            "Outline the plot of a {genre} story set in {setting} whose central conflict is {conflict}.",
            1000,
            0.7,
        ))
        .with_node(text(
            "write_story",
            "Story",
            "Write the full story",
            "Using these characters and plot notes: {text}\nwrite a complete short story.",
            3000,
            0.9,
        ))
        .with_node(image(
            "create_illustrations",
            "Illustrations",
            "Illustrate the story",
            "illustration",
            768,
            1024,
        ))
        .with_node(music(
            "create_soundtrack",
            "Soundtrack",
            "Score the story",
            "cinematic",
            120,
        ))
        .with_node(
            node(
                "analyze_story",
                NodeType::ContentAnalysis,
                "Story analysis",
                "Themes and emotional arc",
            )
            .with_config("analysis_type", "literary"),
        )
        .with_node(output(
            "compile_story_package",
            "Story package",
            "Everything produced for the story",
            &["text", "image_url", "audio_url", "theme", "mood"],
        ));

    edges(
        def,
        &[
            ("input_story_concept", "develop_characters"),
            ("input_story_concept", "create_plot_outline"),
            ("develop_characters", "write_story"),
            ("create_plot_outline", "write_story"),
            ("write_story", "create_illustrations"),
            ("write_story", "create_soundtrack"),
            ("write_story", "analyze_story"),
            ("create_illustrations", "compile_story_package"),
            ("create_soundtrack", "compile_story_package"),
            ("analyze_story", "compile_story_package"),
        ],
    )
}

pub fn product_marketing() -> WorkflowDefinition {
    let def = WorkflowDefinition::new("product_marketing_workflow", "Product marketing")
        .with_description("Market analysis, copy, visuals and ad music, published to a platform")
        .with_metadata("category", "marketing")
        .with_metadata("difficulty", "intermediate")
        .with_metadata("estimated_time", "8-15 minutes")
        .with_node(input(
            "input_product_info",
            "Product info",
            "What is being sold",
            &["product_name", "features", "target_market", "unique_selling_points"],
        ))
        .with_node(text(
            "market_analysis",
            "Market analysis",
            "Analyze the target market",
            "Analyze the {target_market} market for {product_name}, focusing on {unique_selling_points}.",
            600,
            0.6,
        ))
        .with_node(text(
            "generate_marketing_copy",
            "Marketing copy",
            "Write the marketing copy",
            "Write marketing copy for {product_name} aimed at {target_market}, highlighting {features} and {unique_selling_points}.",
            800,
            0.8,
        ))
        .with_node(image(
            "create_product_visuals",
            "Product visuals",
            "Product photography",
            "product_photography",
            1200,
            800,
        ))
        .with_node(music(
            "create_ad_music",
            "Ad music",
            "Jingle for the campaign",
            "commercial",
            30,
        ))
        .with_node(
            node(
                "optimize_marketing_content",
                NodeType::ContentOptimization,
                "Optimize",
                "Optimize for conversion",
            )
            .with_config("platform", "marketing")
            .with_config("optimization_level", "conversion_focused"),
        )
        .with_node(
            node(
                "multi_platform_publish",
                NodeType::PlatformPublish,
                "Publish",
                "Publish the campaign",
            )
            .with_config("platform", "xiaohongshu")
            .with_config("auto_publish", false),
        );

    edges(
        def,
        &[
            ("input_product_info", "market_analysis"),
            ("input_product_info", "generate_marketing_copy"),
            ("input_product_info", "create_product_visuals"),
            ("generate_marketing_copy", "create_ad_music"),
            ("market_analysis", "optimize_marketing_content"),
            ("generate_marketing_copy", "optimize_marketing_content"),
            ("create_product_visuals", "optimize_marketing_content"),
            ("create_ad_music", "optimize_marketing_content"),
            ("optimize_marketing_content", "multi_platform_publish"),
        ],
    )
}

/// Every predefined template
pub fn all() -> Vec<WorkflowDefinition> {
    vec![blog_post(), social_media(), story_creation(), product_marketing()]
}

pub fn list_templates() -> Vec<TemplateSummary> {
    all().iter().map(TemplateSummary::from_definition).collect()
}

pub fn get_template(template_id: &str) -> Option<WorkflowDefinition> {
    all().into_iter().find(|t| t.id == template_id)
}

/// A copy of the template under a fresh id, ready for `create_workflow`
pub fn instantiate_template(template_id: &str) -> Option<WorkflowDefinition> {
    let mut def = get_template(template_id)?;
    let suffix = Uuid::new_v4().simple().to_string();
    def.id = format!("{}-{}", template_id, &suffix[..8]);
    def.metadata
        .insert("template_id".to_string(), Value::from(template_id));
    Some(def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn templates_are_well_formed() {
        for def in all() {
            let ids: HashSet<&str> = def.nodes.iter().map(|n| n.id.as_str()).collect();
            assert_eq!(ids.len(), def.nodes.len(), "duplicate node in {}", def.id);
            for edge in &def.edges {
                assert!(ids.contains(edge.from.as_str()), "{}: {}", def.id, edge.from);
                assert!(ids.contains(edge.to.as_str()), "{}: {}", def.id, edge.to);
            }
        }
    }

    #[test]
    fn summaries_read_metadata() {
        let summaries = list_templates();
        assert_eq!(summaries.len(), 4);
        let story = summaries
            .iter()
            .find(|s| s.id == "story_creation_workflow")
            .unwrap();
        assert_eq!(story.difficulty, "advanced");
        assert_eq!(story.node_count, 8);
    }

    #[test]
    fn instantiation_uses_fresh_ids() {
        let a = instantiate_template("blog_post_workflow").unwrap();
        let b = instantiate_template("blog_post_workflow").unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("blog_post_workflow-"));
        assert_eq!(a.metadata["template_id"], Value::from("blog_post_workflow"));
        assert!(instantiate_template("nope").is_none());
    }
}
