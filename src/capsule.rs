//! What the presentation layer needs to draw a capsule: a round album cover
//! with a plastic rim and shine, placed and rotated from a snapshot.

use super::*;
use crate::arena::{CapsuleView, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapsuleFace {
    Artwork { url: String, alt: String },
    /// No artwork. First character of the title, `'?'` for an empty title.
    Initial(char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapsuleSprite {
    pub post_id: PostId,
    /// Top-left corner of the bounding square, container pixels.
    pub left: f32,
    pub top: f32,
    pub diameter: f32,
    /// Radians.
    pub rotation: f32,
    pub face: CapsuleFace,
    pub rim: bool,
    pub shine: bool,
}
impl CapsuleSprite {
    pub fn layout(view: &CapsuleView, radius: f32) -> Self {
        let post = &view.post;
        let face = if post.album_art_url.is_empty() {
            CapsuleFace::Initial(post.title.chars().next().unwrap_or('?'))
        } else {
            CapsuleFace::Artwork {
                url: post.album_art_url.clone(),
                alt: post.title.clone(),
            }
        };

        Self {
            post_id: view.post_id.clone(),
            left: view.x - radius,
            top: view.y - radius,
            diameter: radius * 2.0,
            rotation: view.angle,
            face,
            rim: true,
            shine: true,
        }
    }

    /// `rotate(..rad)`, ready for a css transform.
    pub fn transform(&self) -> String {
        format!("rotate({}rad)", self.rotation)
    }

    pub fn center(&self) -> (f32, f32) {
        let radius = self.diameter * 0.5;
        (self.left + radius, self.top + radius)
    }
}

/// Sprites in draw order, later ones on top.
pub fn layout_snapshot(snapshot: &Snapshot, radius: f32) -> Vec<CapsuleSprite> {
    snapshot
        .capsules
        .iter()
        .map(|view| CapsuleSprite::layout(view, radius))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::test_post;

    fn view(post: Post, x: f32, y: f32, angle: f32) -> CapsuleView {
        CapsuleView {
            post_id: post.id.clone(),
            post: Arc::new(post),
            x,
            y,
            angle,
        }
    }

    #[test]
    fn test_layout() {
        let mut post = test_post("a", chrono::Utc::now());
        post.album_art_url = "https://img/a.jpg".to_owned();

        let sprite = CapsuleSprite::layout(&view(post, 100.0, 200.0, 0.5), 35.0);

        assert_eq!(sprite.left, 65.0);
        assert_eq!(sprite.top, 165.0);
        assert_eq!(sprite.diameter, 70.0);
        assert_eq!(sprite.center(), (100.0, 200.0));
        assert_eq!(sprite.transform(), "rotate(0.5rad)");
        assert!(matches!(sprite.face, CapsuleFace::Artwork { ref url, .. } if url == "https://img/a.jpg"));
    }

    #[test]
    fn test_face_without_artwork() {
        let mut post = test_post("a", chrono::Utc::now());
        post.title = "Étude".to_owned();
        let sprite = CapsuleSprite::layout(&view(post.clone(), 0.0, 0.0, 0.0), 35.0);
        assert_eq!(sprite.face, CapsuleFace::Initial('É'));

        post.title.clear();
        let sprite = CapsuleSprite::layout(&view(post, 0.0, 0.0, 0.0), 35.0);
        assert_eq!(sprite.face, CapsuleFace::Initial('?'));
    }

    #[test]
    fn test_layout_snapshot_keeps_order() {
        let snapshot = Snapshot {
            frame: 3,
            capsules: vec![
                view(test_post("a", chrono::Utc::now()), 0.0, 0.0, 0.0),
                view(test_post("b", chrono::Utc::now()), 0.0, 0.0, 0.0),
            ],
        };

        let ids: Vec<_> = layout_snapshot(&snapshot, 35.0)
            .into_iter()
            .map(|sprite| sprite.post_id)
            .collect();
        assert_eq!(ids, [PostId::new("a"), PostId::new("b")]);
    }
}
