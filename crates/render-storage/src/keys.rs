//! Object key layout for the outputs this worker publishes (§6).

use render_models::ProjectId;

/// `renders/<projectId>/<uuid>.mp4`
pub fn render_output_key(project_id: &ProjectId, render_uuid: &str) -> String {
    format!("renders/{}/{}.mp4", project_id.as_str(), render_uuid)
}

/// `renders/<projectId>/<uuid>_thumb.jpg`
pub fn render_thumbnail_key(project_id: &ProjectId, render_uuid: &str) -> String {
    format!("renders/{}/{}_thumb.jpg", project_id.as_str(), render_uuid)
}

/// `clips/<clipId>/<resolution>.mp4`
pub fn clip_rendition_key(clip_id: &str, resolution: &str) -> String {
    format!("clips/{clip_id}/{resolution}.mp4")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_keys_are_scoped_under_the_project() {
        let project_id = ProjectId::from_string("proj1");
        assert_eq!(render_output_key(&project_id, "u1"), "renders/proj1/u1.mp4");
        assert_eq!(render_thumbnail_key(&project_id, "u1"), "renders/proj1/u1_thumb.jpg");
    }

    #[test]
    fn clip_rendition_key_is_scoped_under_the_clip() {
        assert_eq!(clip_rendition_key("clip1", "720p"), "clips/clip1/720p.mp4");
    }
}
