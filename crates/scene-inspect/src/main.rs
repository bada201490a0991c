use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use glam::Vec3;
use log::error;
use scene_asset::{index::Index, math::BoundingBox, node::Node, Asset, LoadParams};

#[derive(Parser)]
#[command(name = "scene-inspect")]
#[command(about = "Decode a glTF document and print its scene graph")]
struct Cli {
    /// `.gltf` or `.glb` file
    path: PathBuf,
}

fn format_bounds(bounds: &BoundingBox) -> String {
    if bounds.is_empty() {
        String::from("empty")
    } else {
        format!("{} .. {}", bounds.min, bounds.max)
    }
}

fn print_node(asset: &Asset, node: Index<Node>, depth: usize) {
    let mut stack = vec![(node, depth)];
    while let Some((node, depth)) = stack.pop() {
        let data = asset.node(node);
        let (_, _, translation) = asset
            .node_world_matrix(node)
            .to_scale_rotation_translation();
        let mut line = format!(
            "{:indent$}#{} {}",
            "",
            node,
            data.name.as_deref().unwrap_or("<unnamed>"),
            indent = depth * 2
        );
        if let Some(mesh) = data.mesh {
            line.push_str(&format!(" mesh #{}", mesh));
        }
        if let Some(camera) = data.camera {
            line.push_str(&format!(" camera #{}", camera));
        }
        if let Some(light) = data.light {
            line.push_str(&format!(" light #{}", light));
        }
        if translation != Vec3::ZERO {
            line.push_str(&format!(" at {}", translation));
        }
        line.push_str(&format!(" bounds {}", format_bounds(&data.bounds)));
        println!("{}", line);

        stack.extend(data.children.iter().rev().map(|child| (*child, depth + 1)));
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let Cli { path } = Cli::parse();

    let asset = match Asset::from_path(&path, &LoadParams::default()) {
        Ok(asset) => asset,
        Err(err) => {
            error!("Failed to decode {}: {}", path.display(), err);
            eprintln!("{}: {} ({:?})", path.display(), err, err.kind());
            return ExitCode::FAILURE;
        }
    };

    let info = asset.info();
    println!("version:    {}", info.version);
    if let Some(generator) = &info.generator {
        println!("generator:  {}", generator);
    }
    if let Some(copyright) = &info.copyright {
        println!("copyright:  {}", copyright);
    }
    if !asset.extensions_used().is_empty() {
        println!("extensions: {}", asset.extensions_used().join(", "));
    }
    if !asset.extensions_required().is_empty() {
        println!("required:   {}", asset.extensions_required().join(", "));
    }
    println!(
        "contents:   {} buffers, {} accessors, {} meshes, {} materials, {} textures, {} nodes, {} skins, {} animations, {} cameras, {} lights",
        asset.buffers().len(),
        asset.accessors().len(),
        asset.meshes().len(),
        asset.materials().len(),
        asset.textures().len(),
        asset.nodes().len(),
        asset.skins().len(),
        asset.animations().len(),
        asset.cameras().len(),
        asset.lights().len()
    );

    for (index, scene) in asset.scenes().iter().enumerate() {
        let marker = if asset.default_scene() == Some(Index::new(index as u32)) {
            " (default)"
        } else {
            ""
        };
        println!(
            "scene #{} {}{} bounds {}",
            index,
            scene.name.as_deref().unwrap_or("<unnamed>"),
            marker,
            format_bounds(&scene.bounds)
        );
        for node in &scene.nodes {
            print_node(&asset, *node, 1);
        }
    }

    ExitCode::SUCCESS
}
