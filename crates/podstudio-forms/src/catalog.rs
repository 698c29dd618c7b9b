//! Built-in form definitions
//!
//! The registration, podcast-settings and episode wizards, together with the
//! closed option lists their enumerated fields draw from. The API crate
//! validates request bodies against the same schemas.

use serde_json::json;

use crate::schema::{FieldSpec, FormSchema, Presence};
use crate::steps::{FormDefinition, StepDefinition};

pub const BUSINESS_TYPES: [&str; 7] = [
    "Retail",
    "Technology",
    "Healthcare",
    "Education",
    "Finance",
    "Entertainment",
    "Other",
];

pub const LANGUAGES: [&str; 7] = [
    "English", "Spanish", "French", "German", "Mandarin", "Hindi", "Other",
];

pub const CATEGORIES: [&str; 8] = [
    "Business",
    "Technology",
    "Education",
    "Entertainment",
    "Health",
    "News",
    "Sports",
    "Other",
];

pub const AUDIENCE_TYPES: [&str; 3] = ["General", "Business", "Niche"];

pub const ACCENTS: [&str; 8] = [
    "US",
    "UK",
    "Indian",
    "Australian",
    "Canadian",
    "Irish",
    "Scottish",
    "Other",
];

pub const VIDEO_STYLES: [&str; 5] = [
    "Background Video",
    "Static Image",
    "Animated Background",
    "Split Screen",
    "Picture-in-Picture",
];

pub const MOODS: [&str; 7] = [
    "Friendly",
    "Professional",
    "Excited",
    "Calm",
    "Casual",
    "Serious",
    "Humorous",
];

pub const DURATIONS: [&str; 6] = [
    "5 minutes",
    "10 minutes",
    "15 minutes",
    "30 minutes",
    "45 minutes",
    "60 minutes",
];

pub const PROFILE_TYPES: [&str; 2] = ["image", "video"];

pub const EPISODE_STATUSES: [&str; 2] = ["draft", "published"];

/// Form ids understood by [`by_id`]
pub const FORM_IDS: [&str; 3] = ["registration", "podcast", "episode"];

/// Look up a built-in form by id
pub fn by_id(id: &str) -> Option<FormDefinition> {
    match id {
        "registration" => Some(registration()),
        "podcast" => Some(podcast()),
        "episode" => Some(episode()),
        _ => None,
    }
}

/// Account sign-up: personal details, business details, podcast hand-off
pub fn registration() -> FormDefinition {
    let schema = FormSchema::new("registration", "Registration")
        .field(FieldSpec::text("name", 2, "Name must be at least 2 characters").labelled("Name"))
        .field(FieldSpec::email("email", "Invalid email address").labelled("Email"))
        .field(
            FieldSpec::text("businessName", 2, "Business name must be at least 2 characters")
                .labelled("Business Name"),
        )
        .field(
            FieldSpec::email("businessEmail", "Invalid business email address")
                .labelled("Business Email"),
        )
        .field(
            FieldSpec::text("businessDetails", 10, "Please provide more business details")
                .labelled("Business Details"),
        )
        .field(
            FieldSpec::choice("businessType", BUSINESS_TYPES, "Please select a business type")
                .labelled("Business Type"),
        )
        .field(
            FieldSpec::url("businessWebsite", "Invalid website URL")
                .optional()
                .labelled("Business Website"),
        )
        .field(
            FieldSpec::text("targetAudience", 10, "Please describe your target audience")
                .labelled("Target Audience"),
        );

    FormDefinition::new(
        schema,
        vec![
            StepDefinition::new(0, "Personal Information", ["name"]).create_only(["email"]),
            StepDefinition::new(
                1,
                "Business Information",
                [
                    "businessName",
                    "businessEmail",
                    "businessDetails",
                    "businessType",
                    "businessWebsite",
                    "targetAudience",
                ],
            ),
            StepDefinition::new(2, "Podcast Settings", Vec::<String>::new()),
        ],
    )
}

/// Podcast show settings
pub fn podcast() -> FormDefinition {
    let schema = FormSchema::new("podcast", "Podcast Settings")
        .field(FieldSpec::text("title", 3, "Title must be at least 3 characters").labelled("Title"))
        .field(
            FieldSpec::text("description", 50, "Description must be at least 50 characters")
                .labelled("Description"),
        )
        .field(
            FieldSpec::url("coverImage", "Invalid cover image URL")
                .optional()
                .labelled("Cover Image"),
        )
        .field(
            FieldSpec::multi_choice("categories", CATEGORIES, 1, "Select at least one category")
                .labelled("Categories"),
        )
        .field(FieldSpec::list("keywords", 1, "Add at least one keyword").labelled("Keywords"))
        .field(FieldSpec::choice("language", LANGUAGES, "Please select a language").labelled("Language"))
        .field(
            FieldSpec::choice("audienceType", AUDIENCE_TYPES, "Please select target audience type")
                .labelled("Audience Type"),
        )
        .field(FieldSpec::url("website", "Invalid website URL").optional().labelled("Website"))
        .field(FieldSpec::email("email", "Invalid email address").optional().labelled("Email"))
        .field(FieldSpec::text("contactNumber", 0, "").optional().labelled("Contact Number"))
        .group("speaker1", Presence::Required, profile_fields("Speaker", "speaker"))
        .group("speaker2", Presence::Optional, profile_fields("Speaker", "speaker"))
        .field(
            FieldSpec::choice("videoStyle", VIDEO_STYLES, "Please select video style")
                .labelled("Video Style"),
        )
        .field(
            FieldSpec::choice("conversationMood", MOODS, "Please select conversation mood")
                .labelled("Conversation Mood"),
        );

    FormDefinition::new(
        schema,
        vec![
            StepDefinition::new(
                0,
                "Basic Information",
                ["title", "description", "categories", "keywords", "language", "audienceType"],
            ),
            StepDefinition::new(
                1,
                "Media & Style",
                ["speaker1", "speaker2", "videoStyle", "conversationMood", "coverImage"],
            ),
            StepDefinition::new(2, "Contact & Social", ["website", "email", "contactNumber"]),
        ],
    )
}

/// A single podcast episode
pub fn episode() -> FormDefinition {
    let schema = FormSchema::new("episode", "Episode")
        .field(FieldSpec::text("title", 3, "Title must be at least 3 characters").labelled("Title"))
        .field(
            FieldSpec::text("description", 50, "Description must be at least 50 characters")
                .labelled("Description"),
        )
        .field(FieldSpec::list("keywords", 1, "Add at least one keyword").labelled("Keywords"))
        .field(
            FieldSpec::choice("duration", DURATIONS, "Please select episode duration")
                .labelled("Duration"),
        )
        .field(FieldSpec::text("voice1", 1, "Please select primary voice").labelled("Primary Voice"))
        .field(FieldSpec::text("voice2", 0, "").optional().labelled("Secondary Voice"))
        .field(
            FieldSpec::choice("voiceAccent", ACCENTS, "Please select voice accent")
                .labelled("Voice Accent"),
        )
        .field(FieldSpec::choice("language", LANGUAGES, "Please select language").labelled("Language"))
        .field(
            FieldSpec::choice("videoStyle", VIDEO_STYLES, "Please select video style")
                .labelled("Video Style"),
        )
        .field(
            FieldSpec::choice("conversationMood", MOODS, "Please select conversation mood")
                .labelled("Conversation Mood"),
        )
        .field(
            FieldSpec::url("coverImage", "Invalid cover image URL")
                .optional()
                .labelled("Cover Image"),
        )
        .group("guest1", Presence::Optional, profile_fields("Guest", "guest"))
        .group("guest2", Presence::Optional, profile_fields("Guest", "guest"))
        .field(FieldSpec::text("backgroundMusic", 0, "").optional().labelled("Background Music"))
        .field(FieldSpec::text("publishDate", 0, "").optional().labelled("Publish Date"))
        .field(
            FieldSpec::choice("status", EPISODE_STATUSES, "Please select a status")
                .with_default(json!("draft"))
                .labelled("Status"),
        );

    FormDefinition::new(
        schema,
        vec![
            StepDefinition::new(
                0,
                "Basic Details",
                [
                    "title",
                    "description",
                    "keywords",
                    "duration",
                    "voice1",
                    "voice2",
                    "voiceAccent",
                    "language",
                ],
            ),
            StepDefinition::new(1, "Guest Details", ["guest1", "guest2"]),
            StepDefinition::new(
                2,
                "Media & Style",
                ["videoStyle", "conversationMood", "coverImage", "backgroundMusic"],
            ),
            StepDefinition::new(3, "Advanced Options", ["publishDate", "status"]),
        ],
    )
}

/// Fields of a speaker or guest profile, relative to the group path
fn profile_fields(title: &str, noun: &str) -> Vec<FieldSpec> {
    vec![
        FieldSpec::text("name", 2, format!("{} name must be at least 2 characters", title))
            .labelled("Name"),
        FieldSpec::choice("profileType", PROFILE_TYPES, "Please select a profile type")
            .with_default(json!("image"))
            .labelled("Profile Type"),
        FieldSpec::any("profileFile").labelled("Profile File"),
        FieldSpec::text("bio", 10, "Bio must be at least 10 characters").labelled("Bio"),
        FieldSpec::text("voice", 1, format!("Please select {} voice", noun)).labelled("Voice"),
        FieldSpec::choice("accent", ACCENTS, format!("Please select {} accent", noun))
            .labelled("Accent"),
        FieldSpec::text("social.twitter", 0, "").optional().labelled("Twitter"),
        FieldSpec::url("social.linkedin", "Invalid LinkedIn URL")
            .optional()
            .labelled("LinkedIn"),
        FieldSpec::url("social.website", "Invalid website URL")
            .optional()
            .labelled("Website"),
    ]
}
