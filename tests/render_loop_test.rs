use tilecanvas::prelude::*;

/// Render passes driven through `Map` against a recording canvas
#[cfg(test)]
mod render_loop_tests {
    use super::*;

    fn build(size: Point, loader: &ManualTileLoader) -> Map {
        MapBuilder::new()
            .with_tile_config(TileLoadingConfig::for_testing())
            .with_url_template("mem://{z}/{x}/{y}")
            .with_loader(loader.clone())
            .with_size(size)
            .build()
            .unwrap()
    }

    fn pixel() -> TileImage {
        TileImage::from_rgba(1, 1, vec![1, 2, 3, 255])
    }

    /// The whole world on a 256 px canvas is tile (0,0,0), drawn over the
    /// unit square once it arrives.
    #[test]
    fn test_pass_command_sequence() {
        let loader = ManualTileLoader::new();
        let mut map = build(Point::new(256.0, 256.0), &loader);
        let mut canvas = RenderContext::new(256, 256);

        map.draw(&mut canvas);
        let key = TileKey::new(0, 0, 0);
        assert!(loader.resolve(key, Ok(pixel())));

        canvas.clear_queue();
        let outcome = map.update(&mut canvas).expect("loaded tile triggers a pass");
        assert_eq!(outcome.stats().map(|stats| stats.drawn), Some(1));

        let commands = canvas.take_queue();
        assert_eq!(commands.len(), 5);
        assert_eq!(commands[0], DrawCommand::SetTransform([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]));
        assert_eq!(
            commands[1],
            DrawCommand::Clear {
                x: 0.0,
                y: 0.0,
                width: 256.0,
                height: 256.0
            }
        );
        match &commands[2] {
            DrawCommand::SetTransform(matrix) => {
                let corner = Point::new(1.0, 1.0).apply_transform(matrix);
                assert!((corner - Point::new(256.0, 256.0)).norm() < 1e-9);
            }
            other => panic!("expected viewer transform, got {other:?}"),
        }
        assert_eq!(
            commands[3],
            DrawCommand::DrawImage {
                image: pixel(),
                x: 0.0,
                y: 0.0,
                width: 1.0,
                height: 1.0
            }
        );
        assert_eq!(commands[4], DrawCommand::SetTransform([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]));
    }

    /// A pass requested while another one holds the guard is dropped and
    /// does not advance the frame counter.
    #[test]
    fn test_draw_is_not_reentrant() {
        let loader = ManualTileLoader::new();
        let mut map = build(Point::new(256.0, 256.0), &loader);
        let mut canvas = RenderContext::new(256, 256);

        let token = map.draw_guard().try_enter().expect("guard is free");
        assert_eq!(map.draw(&mut canvas), DrawOutcome::Skipped);
        assert_eq!(map.frame_count(), 0);
        assert!(canvas.get_drawing_queue().is_empty());
        assert!(loader.started_keys().is_empty());

        drop(token);
        assert!(matches!(map.draw(&mut canvas), DrawOutcome::Drawn(_)));
        assert_eq!(map.frame_count(), 1);
    }

    /// Zooming in picks a finer level and only requests covered tiles.
    #[test]
    fn test_zoomed_view_requests_covered_tiles() {
        let loader = ManualTileLoader::new();
        let mut map = build(Point::new(512.0, 256.0), &loader);
        map.set_location(Location::new(0.375, 0.3125, 0.25)).unwrap();

        let mut canvas = RenderContext::new(512, 256);
        let stats = *map.draw(&mut canvas).stats().unwrap();
        assert_eq!(stats.zoom, 3);
        assert_eq!(stats.requested, 6);
        assert_eq!(stats.drawn, 0);

        // Two slots in the testing config; the rest wait in the queue.
        assert_eq!(loader.started_keys().len(), 2);
        assert_eq!(map.tile_layer().scheduler().queued_len(), 4);
    }

    /// Failed tiles leave a hole but never stop the loop.
    #[test]
    fn test_failed_tile_renders_as_empty_space() {
        let loader = ManualTileLoader::new();
        let mut map = build(Point::new(256.0, 256.0), &loader);
        let mut canvas = RenderContext::new(256, 256);

        assert!(map.update(&mut canvas).is_some());
        loader.resolve(TileKey::new(0, 0, 0), Err(MapError::TileLoad("503".into())));
        assert!(map.update(&mut canvas).is_none());

        map.request_redraw();
        let stats = *map.update(&mut canvas).unwrap().stats().unwrap();
        assert_eq!(stats.requested, 1);
        assert_eq!(stats.drawn, 0);
        assert_eq!(loader.started_keys().len(), 1);
    }

    /// Gestures reach the transform and the listener sees the new camera.
    #[test]
    fn test_gesture_notifies_listener() {
        let loader = ManualTileLoader::new();
        let mut map = build(Point::new(256.0, 256.0), &loader);
        let mut canvas = RenderContext::new(256, 256);
        map.update(&mut canvas);

        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        map.set_location_listener(move |location| {
            if let Ok(mut slot) = sink.lock() {
                *slot = Some(location);
            }
        });

        // Pin the canvas center onto world (0.25, 0.25).
        map.process_constraints(&[Constraint::new(
            Point::new(128.0, 128.0),
            Point::new(0.25, 0.25),
        )]);
        assert!(map.update(&mut canvas).is_some());

        let location = seen.lock().unwrap().take().expect("listener called");
        assert!((location.x - 0.25).abs() < 1e-9);
        assert!((location.y - 0.25).abs() < 1e-9);
        assert!((location.scale - 1.0).abs() < 1e-9);
    }

    /// Framing waypoints centers them with the default margin.
    #[test]
    fn test_fit_points_frames_waypoints() {
        let loader = ManualTileLoader::new();
        let mut map = build(Point::new(400.0, 200.0), &loader);
        map.fit_points(
            [Point::new(0.1, 0.2), Point::new(0.3, 0.3), Point::new(0.2, 0.25)],
            Margin::default(),
        )
        .unwrap();

        let location = map.location();
        assert!((location.x - 0.2).abs() < 1e-9);
        assert!((location.y - 0.25).abs() < 1e-9);
        assert!((location.scale - 0.22).abs() < 1e-9);
    }
}
