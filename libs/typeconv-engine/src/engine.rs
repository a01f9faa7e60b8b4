use std::fmt;
use std::sync::{Arc, LazyLock};

use typeconv_api::{Reflect, Type, Value, WireCodec};
use typeconv_codec_json::JsonCodec;

use crate::cache::{PlanCache, PlanKey};
use crate::error::ConvertError;
use crate::exec::Session;
use crate::fields::{discover_fields, FieldMap};
use crate::options::Options;
use crate::plan::{join_fields, CompiledPlan, Plan};
use crate::registry::{ConverterRegistry, CustomConverter};

static GLOBAL: LazyLock<Engine> = LazyLock::new(Engine::new);

/// Conversion engine: plan caches plus the wire codec used as fallback.
///
/// Cheap to clone; clones share caches. Engines created separately do not.
#[derive(Clone)]
pub struct Engine {
    caches: Arc<PlanCache>,
    codec: Arc<dyn WireCodec>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("codec", &self.codec.name())
            .field("field_maps", &self.caches.field_maps.len())
            .field("plans", &self.caches.plans.len())
            .finish()
    }
}

impl Engine {
    /// Engine with empty caches and the JSON fallback codec.
    pub fn new() -> Self {
        Self::with_codec(JsonCodec)
    }

    pub fn with_codec(codec: impl WireCodec + 'static) -> Self {
        Self {
            caches: Arc::new(PlanCache::new()),
            codec: Arc::new(codec),
        }
    }

    /// Process-wide engine behind the free `convert` and `build_plan`.
    pub fn global() -> &'static Engine {
        &GLOBAL
    }

    pub fn codec(&self) -> &dyn WireCodec {
        self.codec.as_ref()
    }

    pub fn caches(&self) -> &PlanCache {
        &self.caches
    }

    /// Matchable fields of `ty` for `tag`, cached per `(ty, tag)`.
    pub fn field_map(&self, ty: Type, tag: &str) -> Arc<FieldMap> {
        self.caches
            .field_maps
            .get_or_insert_with((ty, tag.to_string()), || discover_fields(ty, tag))
    }

    /// Build or fetch the cached top-level plan from `src` to `dst`.
    pub fn compile(
        &self,
        src: Type,
        dst: Type,
        options: &Options,
    ) -> Result<Arc<CompiledPlan>, ConvertError> {
        let options = options.normalized();
        let key = PlanKey {
            src,
            dst,
            strict_types: options.strict_types,
            tag: options.tag.clone(),
        };
        if let Some(plan) = self.caches.plans.get(&key) {
            tracing::debug!(%src, %dst, tag = %options.tag, "conversion plan served from cache");
            return Ok(plan);
        }

        let src_map = self.field_map(src, &options.tag);
        let dst_map = self.field_map(dst, &options.tag);
        for (ty, map) in [(src, &src_map), (dst, &dst_map)] {
            if map.is_empty() {
                return Err(ConvertError::NoMappableFields {
                    type_name: ty.name().to_string(),
                    tag: options.tag.clone(),
                });
            }
        }

        let steps = join_fields(&src_map, &dst_map);
        if steps.is_empty() {
            return Err(ConvertError::NoOverlappingFields {
                src: src.name().to_string(),
                dst: dst.name().to_string(),
                tag: options.tag.clone(),
            });
        }

        let plan = self.caches.plans.insert(
            key,
            CompiledPlan {
                src,
                dst,
                steps,
                options,
            },
        );
        tracing::debug!(
            %src,
            %dst,
            steps = plan.steps.len(),
            tag = %plan.options.tag,
            "compiled conversion plan"
        );
        Ok(plan)
    }

    /// Nested plan between two record types. Not cached: only the field
    /// maps it is built from are. `None` when nothing overlaps.
    pub(crate) fn join(&self, src: Type, dst: Type, options: &Options) -> Option<CompiledPlan> {
        let steps = join_fields(
            &self.field_map(src, &options.tag),
            &self.field_map(dst, &options.tag),
        );
        if steps.is_empty() {
            return None;
        }
        Some(CompiledPlan {
            src,
            dst,
            steps,
            options: options.clone(),
        })
    }

    /// Typed top-level plan from `S` to `D`.
    pub fn build_plan<S: Reflect, D: Reflect>(
        &self,
        options: &Options,
    ) -> Result<Plan<S, D>, ConvertError> {
        let compiled = self.compile(Type::of::<S>(), Type::of::<D>(), options)?;
        Ok(Plan::new(compiled, self.clone()))
    }

    /// Copy `src` into `dst` with default options and the given custom
    /// converters, which apply to their type pair at any depth.
    pub fn convert<S: Reflect, D: Reflect>(
        &self,
        src: &S,
        dst: &mut D,
        converters: Vec<CustomConverter>,
    ) -> Result<(), ConvertError> {
        let plan = self.build_plan::<S, D>(&Options::default())?;
        let registry = ConverterRegistry::build(converters)?;
        plan.convert_with(dst, src, &registry)
    }

    /// Run a compiled plan over reflected values.
    pub fn execute(
        &self,
        plan: &CompiledPlan,
        dst: &mut Value,
        src: &Value,
        registry: &ConverterRegistry,
    ) -> Result<(), ConvertError> {
        Session::new(self, &plan.options, registry).run(plan, dst, src)
    }
}
