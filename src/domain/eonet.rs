use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Absolute URL of the category's events endpoint.
    pub link: String,
    /// Events attached locally after download; never sent by the API.
    #[serde(default, skip_deserializing)]
    pub events: Vec<NaturalEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaturalEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub closed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    #[serde(default)]
    pub geometries: Vec<Geometry>,
}

impl NaturalEvent {
    /// Most recent observation date, if the event has any geometry.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.geometries.iter().map(|g| g.date).max()
    }

    pub fn belongs_to(&self, category_id: i64) -> bool {
        self.categories.iter().any(|c| c.id == category_id)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoriesEnvelope {
    #[serde(default)]
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsEnvelope {
    #[serde(default)]
    pub events: Vec<NaturalEvent>,
}

/// Events from `events` that belong to `category` and are not attached to it
/// yet, newest first. Undated events sort last.
pub fn filtered_events(events: &[NaturalEvent], category: &Category) -> Vec<NaturalEvent> {
    let mut matching: Vec<NaturalEvent> = events
        .iter()
        .filter(|e| e.belongs_to(category.id))
        .filter(|e| !category.events.iter().any(|known| known.id == e.id))
        .cloned()
        .collect();

    matching.sort_by(|a, b| b.date().cmp(&a.date()));
    matching
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, category: i64, date: Option<&str>) -> NaturalEvent {
        NaturalEvent {
            id: id.into(),
            title: format!("Event {}", id),
            description: None,
            closed: None,
            categories: vec![CategoryRef { id: category }],
            geometries: date
                .map(|d| vec![Geometry { date: d.parse().unwrap() }])
                .unwrap_or_default(),
        }
    }

    fn category(id: i64) -> Category {
        Category {
            id,
            title: "Wildfires".into(),
            description: String::new(),
            link: format!("https://eonet.gsfc.nasa.gov/api/v2.1/categories/{}", id),
            events: Vec::new(),
        }
    }

    #[test]
    fn test_filtered_events_matches_category_newest_first() {
        let events = vec![
            event("a", 8, Some("2024-01-01T00:00:00Z")),
            event("b", 10, Some("2024-03-01T00:00:00Z")),
            event("c", 8, Some("2024-02-01T00:00:00Z")),
            event("d", 8, None),
        ];

        let ids: Vec<_> = filtered_events(&events, &category(8))
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "d"]);
    }

    #[test]
    fn test_filtered_events_skips_already_attached() {
        let events = vec![event("a", 8, None), event("b", 8, None)];
        let mut wildfires = category(8);
        wildfires.events.push(event("a", 8, None));

        let ids: Vec<_> = filtered_events(&events, &wildfires)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_decode_envelopes() {
        let body = r#"{"title": "EONET Event Categories", "categories": [
            {"id": 8, "title": "Wildfires", "link": "https://eonet.gsfc.nasa.gov/api/v2.1/categories/8",
             "description": "Wildland fires", "layers": "..."}
        ]}"#;
        let envelope: CategoriesEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.categories.len(), 1);
        assert!(envelope.categories[0].events.is_empty());

        let body = r#"{"events": [{"id": "EONET_1", "title": "Fire", "closed": null,
            "categories": [{"id": 8, "title": "Wildfires"}],
            "geometries": [{"date": "2024-05-01T00:00:00Z", "type": "Point", "coordinates": [1.0, 2.0]}]}]}"#;
        let envelope: EventsEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.events[0].date(), Some("2024-05-01T00:00:00Z".parse().unwrap()));
        assert!(envelope.events[0].belongs_to(8));
    }
}
