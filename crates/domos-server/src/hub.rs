//! Hub façade
//!
//! The [`Hub`] is what the bus-transport frontend drives: modules register
//! through it, publish sensor values through it, and the dashboard reads
//! through it. It owns one store session and the sending end of the
//! propagation queue; publishing a value enqueues a change event and returns
//! without waiting for any recomputation.

use chrono::{DateTime, Utc};
use domos_core::{
    ChangeEvent, ModuleDescriptor, ModuleId, RpcArgDescriptor, RpcDescriptor, RpcKind, SensorId,
};
use domos_engine::CommandSink;
use domos_store::{
    Module, NewSensor, SensorArgValue, SensorInfo, SensorListing, Store, StoreError,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub type HubResult<T> = Result<T, HubError>;

#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no sensor with ident '{ident}'")]
    UnknownSensor { ident: String },

    #[error("propagation queue closed")]
    PipelineClosed,
}

/// Outcome of a module registration.
#[derive(Debug)]
pub enum Registration {
    /// First contact; the module and its RPCs are now persisted.
    Registered { module: ModuleId },

    /// The name was already known. The module is reactivated and gets its
    /// known sensors back so it can provision them again.
    Known {
        module: ModuleId,
        sensors: Vec<SensorInfo>,
    },
}

pub struct Hub {
    store: Store,
    pipeline: mpsc::UnboundedSender<ChangeEvent>,
    sink: Arc<dyn CommandSink>,
}

impl Hub {
    pub fn new(
        store: Store,
        pipeline: mpsc::UnboundedSender<ChangeEvent>,
        sink: Arc<dyn CommandSink>,
    ) -> Self {
        Self {
            store,
            pipeline,
            sink,
        }
    }

    /// Register a module by descriptor. A known name is reactivated and gets
    /// its sensors back; an unknown one is persisted whole.
    pub fn register(&self, desc: &ModuleDescriptor) -> HubResult<Registration> {
        match self.store.find_module(&desc.name)? {
            Some(module) => {
                self.store.set_module_active(module.id, true)?;
                let mut sensors = Vec::new();
                for sensor in self.store.module_sensors(module.id)? {
                    let args = self.store.sensor_args(sensor.id)?;
                    sensors.push(SensorInfo { sensor, args });
                }
                info!(module = %desc.name, sensors = sensors.len(), "module re-registered");
                Ok(Registration::Known {
                    module: module.id,
                    sensors,
                })
            }
            None => {
                let id = self.store.add_module(desc)?;
                info!(module = %desc.name, id = %id, "module registered");
                Ok(Registration::Registered { module: id })
            }
        }
    }

    /// Accept a published sensor value. This is the sole entry point into the
    /// propagation pipeline: the value is durably appended (unless the sensor
    /// is instant) and a change event is enqueued.
    pub fn sensor_value(
        &self,
        sensor_id: SensorId,
        value: &str,
        at: Option<DateTime<Utc>>,
    ) -> HubResult<()> {
        let sensor = self.store.get_sensor(sensor_id)?;
        if !sensor.active {
            return Err(StoreError::SensorInactive(sensor_id).into());
        }
        if !sensor.instant {
            self.store
                .add_sensor_value(sensor_id, value, at.unwrap_or_else(Utc::now))?;
        }
        debug!(sensor = %sensor_id, value, "sensor value accepted");
        self.pipeline
            .send(ChangeEvent::sensor(sensor_id, value))
            .map_err(|_| HubError::PipelineClosed)
    }

    /// Create a sensor. With `push` set, the definition also goes out to the
    /// owning module over its `add` RPC, so the module starts measuring.
    pub async fn add_sensor(
        &self,
        module_id: ModuleId,
        new: &NewSensor,
        push: bool,
    ) -> HubResult<SensorId> {
        let id = self.store.add_sensor(module_id, new)?;
        if push {
            self.push_definition(module_id, id).await?;
        }
        Ok(id)
    }

    async fn push_definition(&self, module_id: ModuleId, sensor_id: SensorId) -> HubResult<()> {
        let module = self.store.get_module(module_id)?;
        let Some(key) = self.store.rpc_key(module_id, RpcKind::Add)? else {
            debug!(module = %module.name, "module has no add rpc, definition not pushed");
            return Ok(());
        };
        let sensor = self.store.get_sensor(sensor_id)?;
        let mut args = serde_json::Map::new();
        args.insert("sensor".into(), json!(sensor.ident));
        for SensorArgValue { name, value } in self.store.sensor_args(sensor_id)? {
            args.insert(name, json!(value));
        }
        if let Err(e) = self
            .sink
            .fire(&module.queue, &key, serde_json::Value::Object(args))
            .await
        {
            warn!(module = %module.name, error = %e, "sensor definition push failed");
        }
        Ok(())
    }

    pub fn modules(&self) -> HubResult<Vec<Module>> {
        Ok(self.store.list_modules()?)
    }

    /// All sensors, or the sensors of one module, joined with the module name.
    pub fn sensors(&self, module: Option<&str>) -> HubResult<Vec<SensorListing>> {
        Ok(self.store.list_sensors(module)?)
    }

    /// Provisioning arguments of the sensor with the given ident.
    pub fn sensor_args(&self, ident: &str) -> HubResult<Vec<SensorArgValue>> {
        let sensor = self
            .store
            .find_sensor_by_ident(ident)?
            .ok_or_else(|| HubError::UnknownSensor {
                ident: ident.to_string(),
            })?;
        Ok(self.store.sensor_args(sensor.id)?)
    }

    /// The `add`-kind RPC descriptors of a module: the sensor prototypes a
    /// dashboard offers when creating a sensor on that module.
    pub fn module_prototypes(&self, module_id: ModuleId) -> HubResult<Vec<RpcDescriptor>> {
        let mut prototypes = Vec::new();
        for rpc in self.store.module_rpcs(module_id)? {
            if rpc.kind != RpcKind::Add {
                continue;
            }
            let args = self
                .store
                .rpc_args(rpc.id)?
                .into_iter()
                .map(|arg| RpcArgDescriptor {
                    name: arg.name,
                    arg_type: arg.arg_type,
                    optional: arg.optional,
                    descr: arg.descr,
                })
                .collect();
            prototypes.push(RpcDescriptor {
                key: rpc.key,
                kind: rpc.kind,
                descr: rpc.descr,
                args,
            });
        }
        Ok(prototypes)
    }
}
