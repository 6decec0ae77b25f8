//! Edit modes and their preset prompts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What kind of edit the user is making. Decides which presets are offered
/// and whether reference images may be attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    #[default]
    Avatar,
    Professional,
    Product,
    Combine,
}

/// How many reference images a mode accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencePolicy {
    None,
    /// One reference; attaching another replaces it.
    Single,
    Many,
}

/// A named, ready-made prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub prompt: &'static str,
}

impl EditMode {
    pub const ALL: [EditMode; 4] = [
        EditMode::Avatar,
        EditMode::Professional,
        EditMode::Product,
        EditMode::Combine,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EditMode::Avatar => "avatar",
            EditMode::Professional => "professional",
            EditMode::Product => "product",
            EditMode::Combine => "combine",
        }
    }

    pub fn reference_policy(self) -> ReferencePolicy {
        match self {
            EditMode::Avatar | EditMode::Professional => ReferencePolicy::None,
            EditMode::Product => ReferencePolicy::Single,
            EditMode::Combine => ReferencePolicy::Many,
        }
    }

    pub fn presets(self) -> &'static [Preset] {
        match self {
            EditMode::Avatar => AVATAR_PRESETS,
            EditMode::Professional => PROFESSIONAL_PRESETS,
            EditMode::Product => PRODUCT_PRESETS,
            EditMode::Combine => COMBINE_PRESETS,
        }
    }

    pub fn preset(self, index: usize) -> Option<&'static Preset> {
        self.presets().get(index)
    }
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown edit mode '{0}' (expected avatar, professional, product or combine)")]
pub struct UnknownMode(pub String);

impl FromStr for EditMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "avatar" => Ok(EditMode::Avatar),
            "professional" | "pro" => Ok(EditMode::Professional),
            "product" => Ok(EditMode::Product),
            "combine" => Ok(EditMode::Combine),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// Prompt that keeps the subject and swaps the background for `description`.
pub fn background_prompt(description: &str) -> String {
    format!(
        "Keep the subject in the foreground exactly as they are, but replace the entire background with: \"{}\". Make the lighting on the subject match the new background for a realistic composite.",
        description.trim()
    )
}

/// Prompt that composites the uploaded product with the reference image(s).
/// A blank instruction falls back to a plain realistic composite.
pub fn product_composite_prompt(instruction: &str) -> String {
    let instruction = instruction.trim();
    if instruction.is_empty() {
        return "Using the first image as the primary product and the second image as the model or scene, combine them realistically. Ensure the final image is photorealistic and well-composited.".to_string();
    }
    format!(
        "Using the first image as the primary product and the additional images as the model or scene, combine them based on the following instruction: \"{instruction}\". Ensure the final image is photorealistic and well-composited."
    )
}

// ---------------------------------------------------------------------------
// Preset tables
// ---------------------------------------------------------------------------

const AVATAR_PRESETS: &[Preset] = &[
    Preset {
        name: "Digital Art",
        prompt: "Turn this photo into a clean, modern digital avatar. Keep the facial features recognisable and use soft lighting with a smooth, vibrant palette.",
    },
    Preset {
        name: "Cartoon",
        prompt: "Turn this photo into a 3D animated-film cartoon avatar with slightly exaggerated, friendly features and vivid colours.",
    },
    Preset {
        name: "Anime",
        prompt: "Redraw this photo as a high-quality anime character with expressive eyes, crisp line art and cel shading.",
    },
    Preset {
        name: "Watercolor",
        prompt: "Repaint this photo as a watercolour portrait with soft blended colours, visible brush strokes and textured paper.",
    },
    Preset {
        name: "Pixel Art",
        prompt: "Convert this photo into a 16-bit pixel art sprite with a limited palette and clearly blocked-out features.",
    },
];

const PROFESSIONAL_PRESETS: &[Preset] = &[
    Preset {
        name: "Studio Look",
        prompt: "Make this a professional headshot: soft light-grey studio background, flattering light, sharper detail and a subtle skin retouch.",
    },
    Preset {
        name: "LinkedIn",
        prompt: "Prepare this photo for a LinkedIn profile: clearer lighting, sharper details and a subtle modern office background.",
    },
    Preset {
        name: "Outdoor",
        prompt: "Make this look like an outdoor portrait by a professional photographer, with golden-hour light and a softly blurred park background.",
    },
    Preset {
        name: "Black & White Film",
        prompt: "Convert this portrait to high-contrast black and white film with fine grain and deep blacks.",
    },
];

const PRODUCT_PRESETS: &[Preset] = &[
    Preset {
        name: "White Background",
        prompt: "Isolate the product and place it on a pure white background with bright, even studio light and a soft shadow underneath.",
    },
    Preset {
        name: "Lifestyle Scene",
        prompt: "Place the product in a fitting lifestyle scene, keeping it in sharp focus against a softly blurred background.",
    },
    Preset {
        name: "Hero Shot",
        prompt: "Create a dramatic hero shot: the product on a dark reflective surface under strong cinematic light.",
    },
    Preset {
        name: "Minimalist Scene",
        prompt: "Stand the product on a simple geometric pedestal against a single-colour background with soft shadows.",
    },
];

const COMBINE_PRESETS: &[Preset] = &[
    Preset {
        name: "Organic Blend",
        prompt: "Blend all provided images into one cohesive, photorealistic composition with consistent lighting and perspective.",
    },
    Preset {
        name: "Subject Placement",
        prompt: "Take the subject from the first image and place them realistically into the scene from the second image, matching light and shadows.",
    },
    Preset {
        name: "Style Transfer",
        prompt: "Redraw the content of the first image in the artistic style and palette of the second image.",
    },
    Preset {
        name: "Double Exposure",
        prompt: "Create a double exposure that merges the silhouettes and textures of the provided images.",
    },
];

#[cfg(test)]
mod tests {
    use super::{EditMode, ReferencePolicy, background_prompt, product_composite_prompt};

    #[test]
    fn modes_parse_from_their_names() {
        for mode in EditMode::ALL {
            assert_eq!(mode.as_str().parse::<EditMode>(), Ok(mode));
        }
        assert_eq!("Pro".parse::<EditMode>(), Ok(EditMode::Professional));
        assert!("sketch".parse::<EditMode>().is_err());
    }

    #[test]
    fn every_mode_offers_presets() {
        for mode in EditMode::ALL {
            assert!(!mode.presets().is_empty(), "{mode} has no presets");
            assert!(mode.preset(mode.presets().len()).is_none());
        }
    }

    #[test]
    fn only_product_and_combine_take_references() {
        assert_eq!(EditMode::Avatar.reference_policy(), ReferencePolicy::None);
        assert_eq!(
            EditMode::Professional.reference_policy(),
            ReferencePolicy::None
        );
        assert_eq!(EditMode::Product.reference_policy(), ReferencePolicy::Single);
        assert_eq!(EditMode::Combine.reference_policy(), ReferencePolicy::Many);
    }

    #[test]
    fn composite_prompt_falls_back_when_blank() {
        assert!(product_composite_prompt("   ").contains("combine them realistically"));
        assert!(product_composite_prompt("on a beach").contains("\"on a beach\""));
        assert!(background_prompt(" a snowy forest ").contains("\"a snowy forest\""));
    }
}
