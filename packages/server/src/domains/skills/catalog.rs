//! Static skill catalog.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SkillCategory {
    pub name: &'static str,
    pub skills: &'static [&'static str],
}

pub const SKILL_CATEGORIES: &[SkillCategory] = &[
    SkillCategory {
        name: "Technology",
        skills: &[
            "Web Development",
            "Mobile Development",
            "Data Science",
            "AI/ML",
            "Cybersecurity",
            "Cloud Computing",
            "DevOps",
            "Blockchain",
            "Game Development",
            "UI/UX Design",
        ],
    },
    SkillCategory {
        name: "Creative",
        skills: &[
            "Graphic Design",
            "Photography",
            "Video Editing",
            "Music Production",
            "Writing",
            "Animation",
            "3D Modeling",
            "Digital Art",
            "Content Creation",
            "Branding",
        ],
    },
    SkillCategory {
        name: "Languages",
        skills: &[
            "Spanish", "French", "German", "Japanese", "Mandarin", "Arabic", "Italian",
            "Portuguese", "Russian", "Korean", "Hindi", "English",
        ],
    },
    SkillCategory {
        name: "Business",
        skills: &[
            "Digital Marketing",
            "SEO",
            "Public Speaking",
            "Leadership",
            "Project Management",
            "Finance",
            "Sales",
            "Consulting",
            "Strategy",
            "Analytics",
        ],
    },
    SkillCategory {
        name: "Lifestyle",
        skills: &[
            "Cooking",
            "Yoga",
            "Fitness",
            "Meditation",
            "Gardening",
            "Home Improvement",
            "Dancing",
            "Martial Arts",
            "Hiking",
            "Travel Planning",
        ],
    },
    SkillCategory {
        name: "Arts & Crafts",
        skills: &[
            "Painting",
            "Pottery",
            "Knitting",
            "Woodworking",
            "Jewelry Making",
            "Calligraphy",
            "Origami",
            "Sewing",
            "Candle Making",
            "Soap Making",
        ],
    },
    SkillCategory {
        name: "Education",
        skills: &[
            "Tutoring",
            "Test Preparation",
            "Academic Writing",
            "Research",
            "Curriculum Development",
            "Online Teaching",
            "Language Teaching",
            "Music Lessons",
            "Art Classes",
        ],
    },
    SkillCategory {
        name: "Professional",
        skills: &[
            "Resume Writing",
            "Interview Coaching",
            "Career Counseling",
            "Networking",
            "Public Relations",
            "Event Planning",
            "Legal Advice",
            "Accounting",
            "Real Estate",
        ],
    },
];

pub const POPULAR_SKILLS: &[&str] = &[
    "Web Development",
    "Graphic Design",
    "Photography",
    "Language Exchange",
    "Music Lessons",
    "Cooking",
    "Yoga",
    "Writing",
    "Marketing",
    "Data Analysis",
    "Spanish",
    "French",
    "Guitar",
    "Piano",
    "Digital Marketing",
    "SEO",
    "Video Editing",
    "UI/UX Design",
    "Python",
    "JavaScript",
    "React",
    "Vue.js",
];

/// Case-insensitive substring search over the catalog, optionally scoped to
/// one category. An unknown category matches nothing.
pub fn search(query: &str, category: Option<&str>, limit: usize) -> Vec<&'static str> {
    let needle = query.to_lowercase();
    let categories: Vec<&SkillCategory> = match category {
        Some(name) => SKILL_CATEGORIES
            .iter()
            .filter(|c| c.name.eq_ignore_ascii_case(name))
            .collect(),
        None => SKILL_CATEGORIES.iter().collect(),
    };
    categories
        .iter()
        .flat_map(|c| c.skills.iter())
        .filter(|skill| skill.to_lowercase().contains(&needle))
        .take(limit)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_across_categories() {
        let hits = search("design", None, 20);
        assert!(hits.contains(&"UI/UX Design"));
        assert!(hits.contains(&"Graphic Design"));
    }

    #[test]
    fn test_search_scoped_to_category() {
        let hits = search("design", Some("creative"), 20);
        assert!(hits.contains(&"Graphic Design"));
        assert!(!hits.contains(&"UI/UX Design"));
    }

    #[test]
    fn test_unknown_category_matches_nothing() {
        assert!(search("design", Some("Sports"), 20).is_empty());
    }

    #[test]
    fn test_limit_is_applied() {
        assert_eq!(search("a", None, 3).len(), 3);
    }
}
