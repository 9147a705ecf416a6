//! MJCF subset reader.

use glam::{DQuat, DVec3};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::model::{Body, Geom, GeomType, Light, Model, ModelCamera, WORLD_BODY};
use crate::{ModelError, Result};

const DEFAULT_DENSITY: f64 = 1000.0;
const DEFAULT_RGBA: [f32; 4] = [0.5, 0.5, 0.5, 1.0];
const DEFAULT_FOVY: f64 = 45.0;

/// Camera whose `target` attribute is resolved after the whole tree is known.
struct PendingCamera {
    camera: ModelCamera,
    target: Option<String>,
}

/// Attribute list of one element, decoded to owned strings.
struct Attrs {
    element: String,
    items: Vec<(String, String)>,
}

impl Attrs {
    fn read(e: &BytesStart<'_>) -> Result<Self> {
        let element = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let mut items = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr.unescape_value()?.into_owned();
            items.push((key, value));
        }
        Ok(Self { element, items })
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn bad(&self, attr: &str, value: &str) -> ModelError {
        ModelError::BadValue {
            element: self.element.clone(),
            attr: attr.to_string(),
            value: value.to_string(),
        }
    }

    fn floats(&self, name: &str) -> Result<Option<Vec<f64>>> {
        let Some(raw) = self.get(name) else { return Ok(None) };
        raw.split_whitespace()
            .map(|t| {
                t.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| self.bad(name, raw))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn fixed<const N: usize>(&self, name: &str) -> Result<Option<[f64; N]>> {
        match self.floats(name)? {
            None => Ok(None),
            Some(v) if v.len() == N => {
                let mut out = [0.0; N];
                out.copy_from_slice(&v);
                Ok(Some(out))
            }
            Some(_) => Err(self.bad(name, self.get(name).unwrap_or_default())),
        }
    }

    fn f64_or(&self, name: &str, default: f64) -> Result<f64> {
        Ok(self.fixed::<1>(name)?.map_or(default, |[v]| v))
    }

    fn vec3_or(&self, name: &str, default: DVec3) -> Result<DVec3> {
        Ok(self.fixed::<3>(name)?.map_or(default, DVec3::from_array))
    }

    /// MJCF quaternions are written `w x y z`.
    fn quat(&self) -> Result<DQuat> {
        match self.fixed::<4>("quat")? {
            None => Ok(DQuat::IDENTITY),
            Some([w, x, y, z]) => {
                let q = DQuat::from_xyzw(x, y, z, w);
                if q.length_squared() == 0.0 {
                    return Err(self.bad("quat", self.get("quat").unwrap_or_default()));
                }
                Ok(q.normalize())
            }
        }
    }

    fn rgb_or(&self, name: &str, default: [f32; 3]) -> Result<[f32; 3]> {
        Ok(self
            .fixed::<3>(name)?
            .map_or(default, |[r, g, b]| [r as f32, g as f32, b as f32]))
    }

    fn flag_or(&self, name: &str, default: bool) -> Result<bool> {
        match self.get(name) {
            None => Ok(default),
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(self.bad(name, other)),
        }
    }
}

/// Streaming MJCF reader.
pub(crate) struct Parser {
    model: Model,
    body_stack: Vec<usize>,
    cameras: Vec<PendingCamera>,
    seen_root: bool,
    in_worldbody: bool,
    depth: usize,
}

impl Parser {
    pub(crate) fn new() -> Self {
        Self {
            model: Model::default(),
            body_stack: Vec::new(),
            cameras: Vec::new(),
            seen_root: false,
            in_worldbody: false,
            depth: 0,
        }
    }

    pub(crate) fn parse(mut self, xml: &str) -> Result<Model> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    self.depth += 1;
                    let attrs = Attrs::read(&e)?;
                    self.open(&attrs, true)?;
                }
                Event::Empty(e) => {
                    let attrs = Attrs::read(&e)?;
                    self.open(&attrs, false)?;
                }
                Event::End(e) => {
                    self.depth = self.depth.saturating_sub(1);
                    match e.name().as_ref() {
                        b"body" if self.in_worldbody => {
                            self.body_stack.pop();
                        }
                        b"worldbody" => self.in_worldbody = false,
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !self.seen_root {
            return Err(ModelError::invalid("missing <mujoco> root element"));
        }
        if self.depth != 0 {
            return Err(ModelError::invalid("unexpected end of document"));
        }

        self.finish()
    }

    fn open(&mut self, a: &Attrs, has_children: bool) -> Result<()> {
        if !self.seen_root {
            if a.element != "mujoco" {
                return Err(ModelError::invalid(format!(
                    "expected <mujoco> root, found <{}>",
                    a.element
                )));
            }
            self.seen_root = true;
            self.model.name = a.get("model").unwrap_or_default().to_string();
            return Ok(());
        }

        match a.element.as_str() {
            "option" => self.parse_option(a)?,
            "worldbody" => self.in_worldbody = has_children,
            "body" if self.in_worldbody => {
                let id = self.parse_body(a)?;
                if has_children {
                    self.body_stack.push(id);
                }
            }
            "freejoint" if self.in_worldbody => self.parse_free_joint()?,
            "joint" if self.in_worldbody => self.parse_joint(a)?,
            "geom" if self.in_worldbody => self.parse_geom(a)?,
            "light" if self.in_worldbody => self.parse_light(a)?,
            "camera" if self.in_worldbody => self.parse_camera(a)?,
            _ => {}
        }
        Ok(())
    }

    fn current_body(&self) -> usize {
        self.body_stack.last().copied().unwrap_or(WORLD_BODY)
    }

    fn parse_option(&mut self, a: &Attrs) -> Result<()> {
        let timestep = a.f64_or("timestep", self.model.timestep)?;
        if timestep <= 0.0 {
            return Err(a.bad("timestep", a.get("timestep").unwrap_or_default()));
        }
        self.model.timestep = timestep;
        self.model.gravity = a.vec3_or("gravity", self.model.gravity)?;
        Ok(())
    }

    fn parse_body(&mut self, a: &Attrs) -> Result<usize> {
        let id = self.model.bodies.len();
        self.model.bodies.push(Body {
            name: a
                .get("name")
                .map_or_else(|| format!("body{id}"), str::to_string),
            parent: Some(self.current_body()),
            pos: a.vec3_or("pos", DVec3::ZERO)?,
            quat: a.quat()?,
            free: false,
            mass: 0.0,
        });
        Ok(id)
    }

    fn parse_free_joint(&mut self) -> Result<()> {
        let body = self.current_body();
        if body == WORLD_BODY {
            return Err(ModelError::invalid("free joint declared outside of a body"));
        }
        if self.model.bodies[body].parent != Some(WORLD_BODY) {
            return Err(ModelError::invalid(format!(
                "free joint on body '{}' which is not a child of the world body",
                self.model.bodies[body].name
            )));
        }
        self.model.bodies[body].free = true;
        Ok(())
    }

    fn parse_joint(&mut self, a: &Attrs) -> Result<()> {
        match a.get("type").unwrap_or("hinge") {
            "free" => self.parse_free_joint(),
            other => {
                // Articulated joints are welded; the body follows its parent.
                log::debug!(
                    "joint type '{other}' on body '{}' is not simulated",
                    self.model.bodies[self.current_body()].name
                );
                Ok(())
            }
        }
    }

    fn parse_geom(&mut self, a: &Attrs) -> Result<()> {
        let type_name = a.get("type").unwrap_or("sphere");
        let geom_type = GeomType::parse(type_name).ok_or_else(|| a.bad("type", type_name))?;

        let fromto = a.fixed::<6>("fromto")?;
        let required = match fromto {
            Some(_) => 1,
            None => geom_type.size_len(),
        };

        let mut size = [0.0; 3];
        if let Some(values) = a.floats("size")? {
            if values.len() < required || values.len() > 3 {
                return Err(a.bad("size", a.get("size").unwrap_or_default()));
            }
            size[..values.len()].copy_from_slice(&values);
        }
        if size.iter().any(|s| *s < 0.0) {
            return Err(a.bad("size", a.get("size").unwrap_or_default()));
        }

        let mut pos = a.vec3_or("pos", DVec3::ZERO)?;
        let mut quat = a.quat()?;

        if let Some([x0, y0, z0, x1, y1, z1]) = fromto {
            let from = DVec3::new(x0, y0, z0);
            let to = DVec3::new(x1, y1, z1);
            let axis = to - from;
            if axis.length_squared() == 0.0 {
                return Err(a.bad("fromto", a.get("fromto").unwrap_or_default()));
            }
            pos = (from + to) * 0.5;
            quat = DQuat::from_rotation_arc(DVec3::Z, axis.normalize());
            size[1] = axis.length() * 0.5;
        }

        let rgba = a
            .fixed::<4>("rgba")?
            .map_or(DEFAULT_RGBA, |v| v.map(|c| c as f32));
        let group = match a.get("group") {
            None => 0,
            Some(raw) => raw
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|g| *g <= 5)
                .ok_or_else(|| a.bad("group", raw))?,
        };

        let body = self.current_body();
        let mut geom = Geom {
            name: a.get("name").unwrap_or_default().to_string(),
            body,
            geom_type,
            size,
            pos,
            quat,
            rgba,
            group,
        };
        if geom.geom_type == GeomType::Sphere {
            geom.size = [size[0]; 3];
        }

        let mass = match a.get("mass") {
            Some(_) => a.f64_or("mass", 0.0)?,
            None => a.f64_or("density", DEFAULT_DENSITY)? * geom.volume(),
        };
        self.model.bodies[body].mass += mass;
        self.model.geoms.push(geom);
        Ok(())
    }

    fn parse_light(&mut self, a: &Attrs) -> Result<()> {
        let dir = a.vec3_or("dir", DVec3::NEG_Z)?;
        if dir.length_squared() == 0.0 {
            return Err(a.bad("dir", a.get("dir").unwrap_or_default()));
        }
        self.model.lights.push(Light {
            body: self.current_body(),
            pos: a.vec3_or("pos", DVec3::ZERO)?,
            dir: dir.normalize(),
            diffuse: a.rgb_or("diffuse", [0.7, 0.7, 0.7])?,
            directional: a.flag_or("directional", false)?,
        });
        Ok(())
    }

    fn parse_camera(&mut self, a: &Attrs) -> Result<()> {
        let target = match a.get("mode") {
            Some("targetbody") | Some("targetbodycom") => {
                Some(a.get("target").unwrap_or("world").to_string())
            }
            _ => None,
        };
        let index = self.model.cameras.len() + self.cameras.len();
        self.cameras.push(PendingCamera {
            camera: ModelCamera {
                name: a
                    .get("name")
                    .map_or_else(|| format!("camera{index}"), str::to_string),
                body: self.current_body(),
                pos: a.vec3_or("pos", DVec3::ZERO)?,
                quat: a.quat()?,
                target: None,
                fovy: a.f64_or("fovy", DEFAULT_FOVY)?,
            },
            target,
        });
        Ok(())
    }

    fn finish(mut self) -> Result<Model> {
        for pending in std::mem::take(&mut self.cameras) {
            let mut camera = pending.camera;
            if let Some(name) = pending.target {
                let id = self.model.body_id(&name).ok_or_else(|| {
                    ModelError::invalid(format!(
                        "camera '{}' targets unknown body '{name}'",
                        camera.name
                    ))
                })?;
                camera.target = Some(id);
            }
            self.model.cameras.push(camera);
        }
        Ok(self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX_SCENE: &str = r#"
        <mujoco>
          <worldbody>
            <geom type="box" size="0.1 0.1 0.1" rgba="0.2 0.6 0.9 1"/>
            <light diffuse="1 1 1" pos="0 0 2"/>
            <camera name="free" mode="targetbody" target="world" pos="0 0 2"/>
          </worldbody>
        </mujoco>
    "#;

    #[test]
    fn parses_box_scene() {
        let m = Model::from_xml(BOX_SCENE).unwrap();
        assert_eq!(m.bodies.len(), 1);
        assert_eq!(m.geoms.len(), 1);
        assert_eq!(m.geoms[0].geom_type, GeomType::Box);
        assert_eq!(m.geoms[0].size, [0.1, 0.1, 0.1]);
        assert_eq!(m.geoms[0].rgba, [0.2, 0.6, 0.9, 1.0]);
        assert_eq!(m.lights[0].diffuse, [1.0, 1.0, 1.0]);
        assert_eq!(m.lights[0].pos, DVec3::new(0.0, 0.0, 2.0));
        assert_eq!(m.cameras[0].name, "free");
        assert_eq!(m.cameras[0].target, Some(WORLD_BODY));
        assert_eq!(m.timestep, 0.002);
    }

    #[test]
    fn nested_bodies_and_free_joint() {
        let m = Model::from_xml(
            r#"<mujoco model="drop">
                 <option timestep="0.005" gravity="0 0 -1"/>
                 <worldbody>
                   <body name="ball" pos="0 0 1">
                     <freejoint/>
                     <geom type="sphere" size="0.1"/>
                     <body name="marker" pos="0 0 0.2">
                       <geom type="box" size="0.01 0.01 0.01" mass="0.5"/>
                     </body>
                   </body>
                 </worldbody>
               </mujoco>"#,
        )
        .unwrap();

        assert_eq!(m.name, "drop");
        assert_eq!(m.timestep, 0.005);
        assert_eq!(m.gravity, DVec3::new(0.0, 0.0, -1.0));
        let ball = m.body_id("ball").unwrap();
        let marker = m.body_id("marker").unwrap();
        assert!(m.bodies[ball].free);
        assert_eq!(m.bodies[marker].parent, Some(ball));
        assert!(m.is_dynamic(marker));
        assert!((m.bodies[marker].mass - 0.5).abs() < 1e-12);
        assert!(m.bodies[ball].mass > 0.0);
    }

    #[test]
    fn fromto_capsule_sets_pose_and_half_length() {
        let m = Model::from_xml(
            r#"<mujoco><worldbody>
                 <geom type="capsule" size="0.05" fromto="0 0 0 0 0 1"/>
               </worldbody></mujoco>"#,
        )
        .unwrap();
        let g = &m.geoms[0];
        assert_eq!(g.size[0], 0.05);
        assert!((g.size[1] - 0.5).abs() < 1e-12);
        assert!((g.pos - DVec3::new(0.0, 0.0, 0.5)).length() < 1e-12);
    }

    #[test]
    fn rejects_mismatched_tags() {
        let err = Model::from_xml("<mujoco><worldbody></mujoco>").unwrap_err();
        assert!(matches!(err, ModelError::Xml(_)), "got {err:?}");
    }

    #[test]
    fn rejects_truncated_document() {
        let err = Model::from_xml("<mujoco><worldbody>").unwrap_err();
        assert!(
            matches!(err, ModelError::Invalid(_) | ModelError::Xml(_)),
            "got {err:?}"
        );
    }

    #[test]
    fn rejects_wrong_root_and_empty_input() {
        assert!(Model::from_xml("<robot/>").is_err());
        assert!(Model::from_xml("").is_err());
        assert!(Model::from_xml("not xml at all").is_err());
    }

    #[test]
    fn rejects_bad_values() {
        let bad_type = r#"<mujoco><worldbody><geom type="teapot"/></worldbody></mujoco>"#;
        assert!(matches!(
            Model::from_xml(bad_type),
            Err(ModelError::BadValue { .. })
        ));

        let bad_num = r#"<mujoco><worldbody><geom size="abc"/></worldbody></mujoco>"#;
        assert!(matches!(
            Model::from_xml(bad_num),
            Err(ModelError::BadValue { .. })
        ));

        let bad_step = r#"<mujoco><option timestep="0"/></mujoco>"#;
        assert!(Model::from_xml(bad_step).is_err());
    }

    #[test]
    fn group_must_be_a_small_integer() {
        let geom = |g: &str| {
            format!(r#"<mujoco><worldbody><geom size="0.1" group="{g}"/></worldbody></mujoco>"#)
        };
        assert_eq!(Model::from_xml(&geom("3")).unwrap().geoms[0].group, 3);
        for bad in ["2.5", "6", "-1", "one"] {
            assert!(
                matches!(Model::from_xml(&geom(bad)), Err(ModelError::BadValue { .. })),
                "group=\"{bad}\" accepted"
            );
        }
    }

    #[test]
    fn attribute_entities_are_unescaped() {
        let xml = r#"<mujoco model="a&amp;b"><worldbody>
                       <body name="arm&lt;1&gt;"/>
                       <camera mode="targetbody" target="arm&lt;1&gt;"/>
                     </worldbody></mujoco>"#;
        let m = Model::from_xml(xml).unwrap();
        assert_eq!(m.name, "a&b");
        assert_eq!(m.bodies[1].name, "arm<1>");
        assert_eq!(m.cameras[0].target, Some(1));
    }

    #[test]
    fn free_joint_requires_top_level_body() {
        let xml = r#"<mujoco><worldbody>
                       <body name="a"><body name="b"><freejoint/></body></body>
                     </worldbody></mujoco>"#;
        assert!(matches!(Model::from_xml(xml), Err(ModelError::Invalid(_))));
    }

    #[test]
    fn camera_with_unknown_target_is_rejected() {
        let xml = r#"<mujoco><worldbody>
                       <camera mode="targetbody" target="ghost"/>
                     </worldbody></mujoco>"#;
        assert!(matches!(Model::from_xml(xml), Err(ModelError::Invalid(_))));
    }

    #[test]
    fn unknown_elements_are_ignored() {
        let xml = r#"<mujoco><asset><texture name="t"/></asset>
                       <worldbody><site name="s"/><geom type="plane" size="1 1 0.1"/></worldbody>
                     </mujoco>"#;
        let m = Model::from_xml(xml).unwrap();
        assert_eq!(m.geoms.len(), 1);
        assert_eq!(m.geoms[0].geom_type, GeomType::Plane);
    }
}
