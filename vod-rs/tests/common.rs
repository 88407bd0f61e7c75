use squadov_vod::*;
use std::time::Duration;

// A metadata document as written by the desktop client
pub const SAMPLE_DOCUMENT: &str = r#"{
  "id": "3f2a7c1e-8d44-4b8e-9a51-0c6f1f2d9e10",
  "userId": "mbao",
  "gameId": "valorant",
  "gameName": "Valorant",
  "title": "Epic Clutch Win #1",
  "description": "Sample VOD recording from Valorant. This is demonstration data.",
  "filePath": "/home/mbao/SquadOV/Storage/VOD/3f2a7c1e-8d44-4b8e-9a51-0c6f1f2d9e10.mp4",
  "thumbnailPath": "",
  "createdAt": "2024-03-09T18:22:05Z",
  "duration": "00:23:41.5000000",
  "fileSize": 734003200,
  "properties": {
    "rank": "Diamond",
    "map": "Ascent",
    "agent": "Jett"
  },
  "tags": ["clutch", "ranked"],
  "isFavorite": true
}"#;

pub fn sample_metadata() -> VodMetadata {
    let mut meta = VodMetadata::new();
    meta.id = "3f2a7c1e-8d44-4b8e-9a51-0c6f1f2d9e10".to_string();
    meta.user_id = "mbao".to_string();
    meta.game_id = "valorant".to_string();
    meta.game_name = "Valorant".to_string();
    meta.title = "Epic Clutch Win #1".to_string();
    meta.description = "Sample VOD recording from Valorant. This is demonstration data.".to_string();
    meta.file_path =
        "/home/mbao/SquadOV/Storage/VOD/3f2a7c1e-8d44-4b8e-9a51-0c6f1f2d9e10.mp4".to_string();
    meta.created_at = "2024-03-09T18:22:05Z".parse().unwrap();
    meta.duration = Duration::from_millis(23 * 60 * 1000 + 41 * 1000 + 500);
    meta.file_size = 734_003_200;
    meta.set_property("rank", "Diamond");
    meta.set_property("map", "Ascent");
    meta.set_property("agent", "Jett");
    meta.tags = vec!["clutch".to_string(), "ranked".to_string()];
    meta.is_favorite = true;
    meta
}
